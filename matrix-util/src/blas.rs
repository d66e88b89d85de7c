//! BLAS-style kernels over `nalgebra` storage.
//!
//! Every routine is generic over the storage type, so it takes owning
//! matrices and borrowed views alike (`m.column(j)`, `m.rows(i, n)`,
//! `m.view((i, j), (r, c))`) and works on a sub-block in place without
//! copying it. Conforming dimensions are the caller's responsibility and
//! are only checked in debug builds.

use nalgebra::{Dyn, Matrix, Storage, StorageMut, U1};

/// Column vector with dynamic length over any storage
pub type GenVec<S> = Matrix<f64, Dyn, U1, S>;

/// Matrix with dynamic shape over any storage
pub type GenMat<S> = Matrix<f64, Dyn, Dyn, S>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transpose {
    No,
    Yes,
}

/// Which triangle of a square matrix (diagonal included) is referenced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Triangle {
    Lower,
    Upper,
}

/// `x' y`
pub fn dot<S1, S2>(x: &GenVec<S1>, y: &GenVec<S2>) -> f64
where
    S1: Storage<f64, Dyn>,
    S2: Storage<f64, Dyn>,
{
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}

/// Euclidean norm, accumulated with a running scale to avoid overflow
pub fn nrm2<S>(x: &GenVec<S>) -> f64
where
    S: Storage<f64, Dyn>,
{
    let mut scale = 0_f64;
    let mut ssq = 1_f64;
    for &v in x.iter() {
        if v != 0.0 {
            let a = v.abs();
            if scale < a {
                ssq = 1.0 + ssq * (scale / a).powi(2);
                scale = a;
            } else {
                ssq += (a / scale).powi(2);
            }
        }
    }
    scale * ssq.sqrt()
}

/// `sum_i |x_i|`
pub fn asum<S>(x: &GenVec<S>) -> f64
where
    S: Storage<f64, Dyn>,
{
    x.iter().map(|v| v.abs()).sum()
}

/// `y <- alpha * x + y`
pub fn axpy<S1, S2>(alpha: f64, x: &GenVec<S1>, y: &mut GenVec<S2>)
where
    S1: Storage<f64, Dyn>,
    S2: StorageMut<f64, Dyn>,
{
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// `x <- alpha * x`
pub fn scal<S>(alpha: f64, x: &mut GenVec<S>)
where
    S: StorageMut<f64, Dyn>,
{
    for v in x.iter_mut() {
        *v *= alpha;
    }
}

/// `y <- alpha * op(A) * x + beta * y`
///
/// With `beta == 0` the previous content of `y` is ignored, even if it
/// holds non-finite values.
pub fn gemv<SA, SX, SY>(
    trans: Transpose,
    alpha: f64,
    a: &GenMat<SA>,
    x: &GenVec<SX>,
    beta: f64,
    y: &mut GenVec<SY>,
) where
    SA: Storage<f64, Dyn, Dyn>,
    SX: Storage<f64, Dyn>,
    SY: StorageMut<f64, Dyn>,
{
    let (nout, nin) = match trans {
        Transpose::No => (a.nrows(), a.ncols()),
        Transpose::Yes => (a.ncols(), a.nrows()),
    };
    debug_assert_eq!(x.len(), nin);
    debug_assert_eq!(y.len(), nout);

    for i in 0..nout {
        let s: f64 = match trans {
            Transpose::No => (0..nin).map(|k| a[(i, k)] * x[k]).sum(),
            Transpose::Yes => (0..nin).map(|k| a[(k, i)] * x[k]).sum(),
        };
        y[i] = if beta == 0.0 {
            alpha * s
        } else {
            alpha * s + beta * y[i]
        };
    }
}

/// whether `op(A)` restricted to `tri` is lower triangular
fn acts_lower(tri: Triangle, trans: Transpose) -> bool {
    matches!(
        (tri, trans),
        (Triangle::Lower, Transpose::No) | (Triangle::Upper, Transpose::Yes)
    )
}

/// `x <- op(T) * x` where `T` is the `tri` triangle of `a`
pub fn trmv<SA, SX>(tri: Triangle, trans: Transpose, a: &GenMat<SA>, x: &mut GenVec<SX>)
where
    SA: Storage<f64, Dyn, Dyn>,
    SX: StorageMut<f64, Dyn>,
{
    let n = x.len();
    debug_assert_eq!(a.nrows(), n);
    debug_assert_eq!(a.ncols(), n);

    let at = |i: usize, k: usize| match trans {
        Transpose::No => a[(i, k)],
        Transpose::Yes => a[(k, i)],
    };

    if acts_lower(tri, trans) {
        // row i only reads x[..=i], so sweep bottom-up
        for i in (0..n).rev() {
            let s: f64 = (0..=i).map(|k| at(i, k) * x[k]).sum();
            x[i] = s;
        }
    } else {
        for i in 0..n {
            let s: f64 = (i..n).map(|k| at(i, k) * x[k]).sum();
            x[i] = s;
        }
    }
}

/// Solve `op(T) * z = x` in place (`x <- z`) where `T` is the `tri`
/// triangle of `a`. The diagonal of `a` must be non-zero.
pub fn trsv<SA, SX>(tri: Triangle, trans: Transpose, a: &GenMat<SA>, x: &mut GenVec<SX>)
where
    SA: Storage<f64, Dyn, Dyn>,
    SX: StorageMut<f64, Dyn>,
{
    let n = x.len();
    debug_assert_eq!(a.nrows(), n);
    debug_assert_eq!(a.ncols(), n);

    let at = |i: usize, k: usize| match trans {
        Transpose::No => a[(i, k)],
        Transpose::Yes => a[(k, i)],
    };

    if acts_lower(tri, trans) {
        for i in 0..n {
            let s: f64 = (0..i).map(|k| at(i, k) * x[k]).sum();
            x[i] = (x[i] - s) / at(i, i);
        }
    } else {
        for i in (0..n).rev() {
            let s: f64 = ((i + 1)..n).map(|k| at(i, k) * x[k]).sum();
            x[i] = (x[i] - s) / at(i, i);
        }
    }
}
