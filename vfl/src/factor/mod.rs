//! Factor kernels.
//!
//! A factor contributes `K` basis functions of the location `x` to a
//! model. Its basis functions depend on `P` parameters that carry a
//! variational posterior, and the factor supplies closed-form
//! expectations of the basis functions (and their pairwise products)
//! under that posterior, together with their gradients with respect to
//! the parameters.

mod cosine;
mod decay;
mod fixed_impulse;
mod impulse;
mod polynomial;
mod product;

pub use cosine::Cosine;
pub use decay::Decay;
pub use fixed_impulse::FixedImpulse;
pub use impulse::Impulse;
pub use polynomial::Polynomial;
pub use product::Product;

use crate::common::*;
use matrix_util::blas::axpy;
use std::any::Any;

/// Attributes shared by every factor kind
#[derive(Clone, Debug, PartialEq)]
pub struct FactorState {
    /// first location coordinate read by the factor
    pub d: usize,
    /// number of location coordinates read
    pub dims: usize,
    /// number of basis functions `K`
    pub nbasis: usize,
    /// parameters, length `P`
    pub par: DVec,
    /// Fisher information of the parameters, `P x P`
    pub inf: Mat,
    /// excluded from gradient-based updates
    pub fixed: bool,
}

impl FactorState {
    pub fn new(dims: usize, npar: usize, nbasis: usize) -> Self {
        Self {
            d: 0,
            dims,
            nbasis,
            par: DVec::zeros(npar),
            inf: Mat::zeros(npar, npar),
            fixed: false,
        }
    }
}

/// A composable kernel with closed-form expectations and gradients.
///
/// Gradient routines overwrite the caller's output vector, which must
/// have length `npar()`. Basis indices must be below `nbasis()`.
pub trait Factor: std::fmt::Debug {
    fn state(&self) -> &FactorState;

    fn state_mut(&mut self) -> &mut FactorState;

    /// short kind name for messages
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn box_clone(&self) -> Box<dyn Factor>;

    /// Expected basis function `i` at location `x`
    fn mean(&self, x: &DVec, i: usize) -> f64;

    /// Expected product of basis functions `i` and `j` at location `x`
    fn var(&self, x: &DVec, i: usize, j: usize) -> f64;

    /// Gradient of [`Factor::mean`] with respect to the parameters
    fn diff_mean(&self, x: &DVec, i: usize, df: &mut DVec);

    /// Gradient of [`Factor::var`] with respect to the parameters
    fn diff_var(&self, x: &DVec, i: usize, j: usize, df: &mut DVec);

    /// Divergence of this factor's posterior from `other`'s, which must
    /// be of the same kind and shape; zero when the two are equal
    fn div(&self, other: &dyn Factor) -> f64;

    /// Check that `value` lies in the domain of parameter `p`
    fn check(&self, p: usize, value: f64) -> anyhow::Result<()>;

    /// Write an already checked value into parameter `p` and refresh the
    /// information matrix entries that depend on it
    fn assign(&mut self, p: usize, value: f64);

    /// Change the number of basis functions
    fn resize(&mut self, _nbasis: usize) -> anyhow::Result<()> {
        anyhow::bail!("{} factors cannot be resized", self.name())
    }

    fn offset(&self) -> usize {
        self.state().d
    }

    fn set_offset(&mut self, d: usize) {
        self.state_mut().d = d;
    }

    fn dims(&self) -> usize {
        self.state().dims
    }

    fn npar(&self) -> usize {
        self.state().par.len()
    }

    fn nbasis(&self) -> usize {
        self.state().nbasis
    }

    fn par(&self) -> &DVec {
        &self.state().par
    }

    fn inf(&self) -> &Mat {
        &self.state().inf
    }

    fn is_fixed(&self) -> bool {
        self.state().fixed
    }

    fn set_fixed(&mut self, fixed: bool) {
        self.state_mut().fixed = fixed;
    }

    fn get(&self, p: usize) -> Option<f64> {
        self.par().get(p).copied()
    }

    /// Validated assignment of parameter `p`; nothing changes on error
    fn set(&mut self, p: usize, value: f64) -> anyhow::Result<()> {
        if p >= self.npar() {
            anyhow::bail!(
                "{} factor has {} parameters, index {} given",
                self.name(),
                self.npar(),
                p
            );
        }
        self.check(p, value)?;
        self.assign(p, value);
        Ok(())
    }

    /// Validated assignment of all parameters at once; either every
    /// component is written or none is
    fn set_parms(&mut self, x: &DVec) -> anyhow::Result<()> {
        if x.len() != self.npar() {
            anyhow::bail!(
                "{} factor has {} parameters, {} given",
                self.name(),
                self.npar(),
                x.len()
            );
        }
        for (p, &value) in x.iter().enumerate() {
            self.check(p, value)?;
        }
        for (p, &value) in x.iter().enumerate() {
            self.assign(p, value);
        }
        Ok(())
    }

    /// Stream one observation into a mean-field update.
    ///
    /// * `b` - first-order coefficients, one per basis function
    /// * `bb` - second-order coefficients, `K x K`
    /// * `acc` - accumulates `sum_k b_k dmean_k + sum_kk' bb_kk' dvar_kk'`
    fn meanfield_accumulate(&self, x: &DVec, b: &DVec, bb: &Mat, acc: &mut DVec) {
        let kk = self.nbasis();
        let mut g = DVec::zeros(self.npar());
        for i in 0..kk {
            self.diff_mean(x, i, &mut g);
            axpy(b[i], &g, acc);
            for j in 0..kk {
                self.diff_var(x, i, j, &mut g);
                axpy(bb[(i, j)], &g, acc);
            }
        }
    }

    /// Complete a mean-field update from the accumulated gradient by
    /// moving to `prior + inf^{-1} acc`
    fn meanfield_finalize(&mut self, prior: &dyn Factor, acc: &DVec) -> anyhow::Result<()> {
        if self.npar() == 0 {
            return Ok(());
        }
        let step = self.inf().spd_solve(acc)?;
        let target = prior.par() + step;
        self.set_parms(&target)
    }
}

impl Clone for Box<dyn Factor> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// KL divergence of `N(mu, 1/tau)` from `N(mu2, 1/tau2)`,
/// `tau2/2 (mu^2 + 1/tau - 2 mu mu2 + mu2^2) - ln(tau2/tau)/2 - 1/2`,
/// grouped so that equal arguments give exactly zero
pub(crate) fn gauss_div(mu: f64, tau: f64, mu2: f64, tau2: f64) -> f64 {
    let ratio = tau2 / tau;
    let dmu = mu - mu2;
    0.5 * (ratio + tau2 * dmu * dmu) - 0.5 * ratio.ln() - 0.5
}

pub(crate) fn check_finite(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() {
        anyhow::bail!("{} must be finite, {} given", name, value);
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        anyhow::bail!("{} must be positive, {} given", name, value);
    }
    Ok(())
}
