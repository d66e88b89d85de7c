//! Cheap spectral estimates for symmetric matrices

use crate::blas::{dot, gemv, nrm2, GenMat, Transpose};
use nalgebra::{DMatrix, DVector, Dyn, Storage};

/// convergence tolerance on successive Rayleigh quotients
pub const MIN_EIGEN_TOL: f64 = 1e-6;

/// hard cap on power iterations
pub const MIN_EIGEN_MAX_STEPS: usize = 5;

/// Gershgorin upper bound on the largest eigenvalue of a real symmetric
/// matrix: the maximum over rows of `a_ii + sum_{j != i} |a_ij|`
pub fn upper_bound<S>(a: &GenMat<S>) -> f64
where
    S: Storage<f64, Dyn, Dyn>,
{
    (0..a.nrows())
        .map(|i| {
            let abs_sum: f64 = (0..a.ncols()).map(|j| a[(i, j)].abs()).sum();
            abs_sum - a[(i, i)].abs() + a[(i, i)]
        })
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Estimate the smallest eigenvalue of a symmetric positive-definite
/// matrix by power iteration on `A - U I`, where `U` is the Gershgorin
/// bound, so the dominant eigenvalue of the shifted matrix is the
/// smallest one of `A` minus `U`.
///
/// The iteration starts from the all-ones vector and stops once
/// successive Rayleigh quotients agree within `MIN_EIGEN_TOL`, or after
/// `MIN_EIGEN_MAX_STEPS` steps. If the shifted matrix annihilates the
/// current vector, `U` itself is returned.
pub fn min_eigenvalue<S>(a: &GenMat<S>) -> f64
where
    S: Storage<f64, Dyn, Dyn>,
{
    let n = a.nrows();
    if n == 1 {
        return a[(0, 0)];
    }

    let mut shifted = DMatrix::<f64>::from_fn(n, n, |i, j| a[(i, j)]);
    let bound = upper_bound(&shifted);
    for i in 0..n {
        shifted[(i, i)] -= bound;
    }

    let mut b = DVector::<f64>::from_element(n, 1.0);
    let mut z = DVector::<f64>::zeros(n);
    let mut mu = 0_f64;
    let mut steps = 0;

    loop {
        gemv(Transpose::No, 1.0, &shifted, &b, 0.0, &mut z);
        let znrm = nrm2(&z);
        if znrm == 0.0 {
            return bound;
        }

        b.copy_from(&z);
        b.unscale_mut(znrm);

        gemv(Transpose::No, 1.0, &shifted, &b, 0.0, &mut z);
        let mu_prev = mu;
        mu = dot(&b, &z);
        steps += 1;

        if (mu_prev - mu).abs() <= MIN_EIGEN_TOL {
            break;
        }
        if steps >= MIN_EIGEN_MAX_STEPS {
            log::debug!(
                "min eigenvalue: stopped after {} steps, change {:.3e}",
                steps,
                (mu_prev - mu).abs()
            );
            break;
        }
    }

    mu + bound
}
