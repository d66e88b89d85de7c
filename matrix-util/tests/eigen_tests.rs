use approx::assert_abs_diff_eq;
use matrix_util::eigen::*;
use matrix_util::traits::{SampleOps, SpectralOps};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn gershgorin_bound() {
    let a = DMatrix::from_row_slice(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
    assert_abs_diff_eq!(upper_bound(&a), 4.0);

    // a negative diagonal counts with its sign
    let b = DMatrix::from_row_slice(2, 2, &[-3.0, 1.0, 1.0, 1.0]);
    assert_abs_diff_eq!(b.gershgorin_bound(), 2.0);
}

#[test]
fn min_eigenvalue_of_diagonal_matrices() {
    for diag in [vec![1.0, 3.0], vec![9.0, 4.0], vec![1.0, 3.0, 3.0], vec![0.5, 7.0]] {
        let expected = diag.iter().cloned().fold(f64::INFINITY, f64::min);
        let a = DMatrix::from_diagonal(&DVector::from_vec(diag));
        assert_abs_diff_eq!(min_eigenvalue(&a), expected, epsilon = MIN_EIGEN_TOL);
    }
}

#[test]
fn min_eigenvalue_of_scalar() {
    let a = DMatrix::from_element(1, 1, 2.5);
    assert_abs_diff_eq!(a.min_eigenvalue(), 2.5);
}

#[test]
fn min_eigenvalue_degenerate_returns_bound() {
    // the shifted matrix is zero, so the first image vanishes
    let a = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 2.0]));
    assert_abs_diff_eq!(min_eigenvalue(&a), upper_bound(&a));
    assert_abs_diff_eq!(min_eigenvalue(&a), 2.0);
}

#[test]
fn min_eigenvalue_dense() {
    // eigenvalues (5 - sqrt 5)/2 and (5 + sqrt 5)/2
    let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
    let expected = (5.0 - 5_f64.sqrt()) / 2.0;
    assert_abs_diff_eq!(min_eigenvalue(&a), expected, epsilon = 1e-4);
}

#[test]
fn min_eigenvalue_on_a_view() {
    let mut big = DMatrix::<f64>::zeros(4, 4);
    big[(1, 1)] = 6.0;
    big[(2, 2)] = 2.0;
    let block = big.view((1, 1), (2, 2));
    assert_abs_diff_eq!(min_eigenvalue(&block), 2.0, epsilon = MIN_EIGEN_TOL);
}

#[test]
fn min_eigenvalue_capped_on_ill_conditioned() -> anyhow::Result<()> {
    // Hilbert matrix: the smallest eigenvalues cluster near zero, so the
    // shifted iteration converges slowly and runs into the step cap
    let n = 6;
    let a = DMatrix::from_fn(n, n, |i, j| 1.0 / (i + j + 1) as f64);
    let exact = a.clone().symmetric_eigen().eigenvalues.min();

    let estimate = min_eigenvalue(&a);
    assert!(estimate.is_finite());
    assert!(estimate > 0.0);
    assert!(estimate < upper_bound(&a));
    assert!(estimate >= exact - MIN_EIGEN_TOL);

    let mut rng = StdRng::seed_from_u64(11);
    let b = DMatrix::<f64>::rand_spd(8, &mut rng);
    let exact = b.clone().symmetric_eigen().eigenvalues.min();
    let estimate = b.min_eigenvalue();
    assert!(estimate >= exact - MIN_EIGEN_TOL);
    assert!(estimate <= b.gershgorin_bound());
    Ok(())
}
