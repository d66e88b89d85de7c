#![allow(dead_code)]

pub use log::{debug, info, warn};

pub type Mat = nalgebra::DMatrix<f64>;
pub type DVec = nalgebra::DVector<f64>;

pub use matrix_util::traits::{CholeskyOps, SpectralOps};
