//! Cholesky factorization `A = L L'` of symmetric positive-definite
//! matrices, with solves and rank-1 modification of an existing factor.
//!
//! A factor produced here is a full square matrix whose strict upper
//! triangle is zero, so `l * l.transpose()` reconstructs `A` directly.

use crate::blas::{trsv, GenMat, GenVec, Transpose, Triangle};
use nalgebra::{DMatrix, DVector, Dyn, Storage, StorageMut};

/// Factorize `a` in place. Only the lower triangle of `a` is read.
///
/// Fails if a pivot is non-positive or non-finite, i.e., `a` is not
/// numerically positive definite. `a` is left partially overwritten in
/// that case.
pub fn decompose<S>(a: &mut GenMat<S>) -> anyhow::Result<()>
where
    S: StorageMut<f64, Dyn, Dyn>,
{
    let n = a.nrows();
    if a.ncols() != n {
        anyhow::bail!("cholesky: {} x {} matrix is not square", n, a.ncols());
    }

    for j in 0..n {
        let mut pivot = a[(j, j)];
        for k in 0..j {
            pivot -= a[(j, k)] * a[(j, k)];
        }

        if !pivot.is_finite() || pivot <= 0.0 {
            anyhow::bail!("cholesky: pivot {} at column {} is not positive", pivot, j);
        }

        let ljj = pivot.sqrt();
        a[(j, j)] = ljj;

        for i in (j + 1)..n {
            let mut s = a[(i, j)];
            for k in 0..j {
                s -= a[(i, k)] * a[(j, k)];
            }
            a[(i, j)] = s / ljj;
        }
    }

    for j in 1..n {
        for i in 0..j {
            a[(i, j)] = 0.0;
        }
    }
    Ok(())
}

/// Solve `L L' x = b` in place; `x` holds `b` on entry
pub fn solve_mut<SL, SX>(l: &GenMat<SL>, x: &mut GenVec<SX>)
where
    SL: Storage<f64, Dyn, Dyn>,
    SX: StorageMut<f64, Dyn>,
{
    trsv(Triangle::Lower, Transpose::No, l, x);
    trsv(Triangle::Lower, Transpose::Yes, l, x);
}

/// Solve `L L' x = b`
pub fn solve<SL, SB>(l: &GenMat<SL>, b: &GenVec<SB>) -> DVector<f64>
where
    SL: Storage<f64, Dyn, Dyn>,
    SB: Storage<f64, Dyn>,
{
    let mut x = DVector::from_iterator(b.len(), b.iter().copied());
    solve_mut(l, &mut x);
    x
}

/// `(L L')^{-1}`, symmetrized
pub fn invert<SL>(l: &GenMat<SL>) -> DMatrix<f64>
where
    SL: Storage<f64, Dyn, Dyn>,
{
    let n = l.nrows();
    let mut inv = DMatrix::<f64>::identity(n, n);
    for j in 0..n {
        let mut col = inv.column_mut(j);
        solve_mut(l, &mut col);
    }
    (&inv + inv.transpose()) * 0.5
}

/// Modify `l` so that it factorizes `A + x x'`.
///
/// Fails, leaving `l` untouched, if a diagonal entry of `l` is not
/// positive. `x` is used as scratch and holds garbage on return.
pub fn update<SL, SX>(l: &mut GenMat<SL>, x: &mut GenVec<SX>) -> anyhow::Result<()>
where
    SL: StorageMut<f64, Dyn, Dyn>,
    SX: StorageMut<f64, Dyn>,
{
    let n = l.nrows();
    debug_assert_eq!(x.len(), n);

    // step k only reads the diagonal entry it is about to overwrite
    if let Some(k) = (0..n).find(|&k| l[(k, k)] <= 0.0 || l[(k, k)].is_nan()) {
        anyhow::bail!("cholesky update: diagonal {} at {} is not positive", l[(k, k)], k);
    }

    for k in 0..n {
        let lkk = l[(k, k)];
        let xk = x[k];
        let r = lkk.hypot(xk);
        let c = r / lkk;
        let s = xk / lkk;
        l[(k, k)] = r;

        for i in (k + 1)..n {
            let lik = (l[(i, k)] + s * x[i]) / c;
            l[(i, k)] = lik;
            x[i] = c * x[i] - s * lik;
        }
    }
    Ok(())
}

/// Modify `l` so that it factorizes `A - x x'`.
///
/// Fails, leaving `l` untouched, if `A - x x'` is not positive
/// definite. `x` is used as scratch either way.
pub fn downdate<SL, SX>(l: &mut GenMat<SL>, x: &mut GenVec<SX>) -> anyhow::Result<()>
where
    SL: StorageMut<f64, Dyn, Dyn>,
    SX: StorageMut<f64, Dyn>,
{
    let n = l.nrows();
    debug_assert_eq!(x.len(), n);

    let mut work = DMatrix::<f64>::from_fn(n, n, |i, j| l[(i, j)]);

    for k in 0..n {
        let lkk = work[(k, k)];
        let xk = x[k];
        let r2 = lkk * lkk - xk * xk;
        if !r2.is_finite() || r2 <= 0.0 || lkk <= 0.0 {
            anyhow::bail!("cholesky downdate: result is not positive definite at {}", k);
        }
        let r = r2.sqrt();
        let c = r / lkk;
        let s = xk / lkk;
        work[(k, k)] = r;

        for i in (k + 1)..n {
            let lik = (work[(i, k)] - s * x[i]) / c;
            work[(i, k)] = lik;
            x[i] = c * x[i] - s * lik;
        }
    }

    l.copy_from(&work);
    Ok(())
}
