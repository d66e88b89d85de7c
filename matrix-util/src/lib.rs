//! Dense linear algebra for variational inference: BLAS-style kernels,
//! Cholesky factorization with rank-1 modification, and cheap spectral
//! estimates, all on `nalgebra` storage.

pub mod blas; // dot, axpy, gemv, triangular product/solve
pub mod chol; // cholesky factorization, solve, update/downdate
pub mod dmatrix_util; // trait implementations for `DMatrix<f64>`
pub mod eigen; // gershgorin bound and minimum eigenvalue
pub mod traits;
