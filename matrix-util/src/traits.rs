/// Cholesky-based routines for symmetric positive-definite matrices
pub trait CholeskyOps {
    type Mat;
    type DVec;

    /// Lower-triangular Cholesky factor `L` with `self = L L'`
    fn cholesky_lower(&self) -> anyhow::Result<Self::Mat>;

    /// Solve `self * x = b`
    fn spd_solve(&self, b: &Self::DVec) -> anyhow::Result<Self::DVec>;

    /// `self^{-1}`
    fn spd_inverse(&self) -> anyhow::Result<Self::Mat>;
}

/// Spectral estimates of symmetric matrices
pub trait SpectralOps {
    type Scalar;

    /// Gershgorin upper bound on the largest eigenvalue
    fn gershgorin_bound(&self) -> Self::Scalar;

    /// Shifted power-iteration estimate of the smallest eigenvalue
    fn min_eigenvalue(&self) -> Self::Scalar;
}

/// Operations to sample random matrices from a caller-provided generator
pub trait SampleOps {
    type Mat;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif<R: rand::Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm<R: rand::Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a well-conditioned symmetric positive-definite matrix
    /// `X X' / n + n I` with `X ~ N(0,1)`
    fn rand_spd<R: rand::Rng>(nn: usize, rng: &mut R) -> Self::Mat;
}
