pub use nalgebra::{DMatrix, DVector};
pub use rand::Rng;
pub use rand_distr::StandardNormal;

use crate::chol;
use crate::eigen;
use crate::traits::*;

impl CholeskyOps for DMatrix<f64> {
    type Mat = DMatrix<f64>;
    type DVec = DVector<f64>;

    fn cholesky_lower(&self) -> anyhow::Result<Self::Mat> {
        let mut l = self.clone();
        chol::decompose(&mut l)?;
        Ok(l)
    }

    fn spd_solve(&self, b: &Self::DVec) -> anyhow::Result<Self::DVec> {
        if b.len() != self.nrows() {
            anyhow::bail!(
                "spd_solve: {} x {} system with rhs of length {}",
                self.nrows(),
                self.ncols(),
                b.len()
            );
        }
        let l = self.cholesky_lower()?;
        Ok(chol::solve(&l, b))
    }

    fn spd_inverse(&self) -> anyhow::Result<Self::Mat> {
        let l = self.cholesky_lower()?;
        Ok(chol::invert(&l))
    }
}

impl SpectralOps for DMatrix<f64> {
    type Scalar = f64;

    fn gershgorin_bound(&self) -> f64 {
        eigen::upper_bound(self)
    }

    fn min_eigenvalue(&self) -> f64 {
        eigen::min_eigenvalue(self)
    }
}

impl SampleOps for DMatrix<f64> {
    type Mat = Self;

    fn runif<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::from_fn(dd, nn, |_, _| rng.random::<f64>())
    }

    fn rnorm<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::from_fn(dd, nn, |_, _| rng.sample(StandardNormal))
    }

    fn rand_spd<R: Rng>(nn: usize, rng: &mut R) -> Self::Mat {
        let xx = Self::rnorm(nn, nn, rng);
        let n = nn as f64;
        let mut ret = &xx * xx.transpose() / n;
        for i in 0..nn {
            ret[(i, i)] += n;
        }
        ret
    }
}
