//! Variational feature learning.
//!
//! Regression and classification models are assembled from composable
//! factor kernels (`factor`), aggregated by a model into a variational
//! lower bound on the marginal likelihood (`model`), and fitted by
//! natural-gradient line search or mean-field coordinate ascent (`optim`).

/// Shared type aliases and logging macros
pub mod common;

/// Observations and sorted datasets
pub mod data;

/// Factor kernels with closed-form expectations and gradients
pub mod factor;

/// Models aggregating factors into a variational lower bound
pub mod model;

/// Optimizers of the variational lower bound
pub mod optim;
