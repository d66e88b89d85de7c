//! Optimizers of the variational lower bound.
//!
//! An optimizer borrows a model mutably for its whole lifetime and
//! improves the bound one factor at a time.

mod full_gradient;
mod mean_field;

pub use full_gradient::FullGradient;
pub use mean_field::MeanField;

use crate::common::*;
use serde::{Deserialize, Serialize};

/// Control parameters shared by the optimizers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimOptions {
    /// Maximum number of backtracking steps per factor
    pub max_steps: usize,

    /// Maximum number of passes over the factors
    pub max_iters: usize,

    /// Initial Lipschitz constant; the first step size is
    /// `min_eigenvalue(inf) / l0`
    pub l0: f64,

    /// Factor by which the step size shrinks after a rejected step
    pub dl: f64,
}

impl Default for OptimOptions {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_iters: 1000,
            l0: 1.0,
            dl: 0.1,
        }
    }
}

impl OptimOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_steps == 0 {
            anyhow::bail!("max_steps must be positive");
        }
        if self.max_iters == 0 {
            anyhow::bail!("max_iters must be positive");
        }
        if !self.l0.is_finite() || self.l0 <= 0.0 {
            anyhow::bail!("initial Lipschitz constant must be positive, {} given", self.l0);
        }
        if !self.dl.is_finite() || self.dl <= 0.0 {
            anyhow::bail!("Lipschitz step must be positive, {} given", self.dl);
        }
        Ok(())
    }

    pub fn set_max_steps(&mut self, max_steps: usize) -> anyhow::Result<()> {
        if max_steps == 0 {
            anyhow::bail!("max_steps must be positive");
        }
        self.max_steps = max_steps;
        Ok(())
    }

    pub fn set_max_iters(&mut self, max_iters: usize) -> anyhow::Result<()> {
        if max_iters == 0 {
            anyhow::bail!("max_iters must be positive");
        }
        self.max_iters = max_iters;
        Ok(())
    }

    pub fn set_lipschitz_init(&mut self, l0: f64) -> anyhow::Result<()> {
        if !l0.is_finite() || l0 <= 0.0 {
            anyhow::bail!("initial Lipschitz constant must be positive, {} given", l0);
        }
        self.l0 = l0;
        Ok(())
    }

    pub fn set_lipschitz_step(&mut self, dl: f64) -> anyhow::Result<()> {
        if !dl.is_finite() || dl <= 0.0 {
            anyhow::bail!("Lipschitz step must be positive, {} given", dl);
        }
        self.dl = dl;
        Ok(())
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let opts: Self = serde_json::from_str(text)?;
        opts.validate()?;
        Ok(opts)
    }
}

pub trait Optimizer {
    fn name(&self) -> &'static str;

    fn options(&self) -> &OptimOptions;

    /// Bound at the start of the latest pass
    fn initial_bound(&self) -> f64;

    /// Bound at the end of the latest pass
    fn bound(&self) -> f64;

    /// One pass over the factors; returns whether the bound changed
    fn iterate(&mut self) -> anyhow::Result<bool>;

    /// Repeat [`Optimizer::iterate`] until the bound stops changing,
    /// decreases, or `max_iters` passes have run. Returns the final
    /// bound.
    fn execute(&mut self) -> anyhow::Result<f64> {
        let max_iters = self.options().max_iters;
        let mut prev = f64::NEG_INFINITY;

        for iter in 0..max_iters {
            let changed = self.iterate()?;
            let bound = self.bound();

            if iter % 10 == 0 {
                info!("{} iter {:5}: bound = {:14.6}", self.name(), iter, bound);
            }

            if !changed {
                info!("{} converged at iteration {} (bound = {:.6})", self.name(), iter, bound);
                break;
            }

            if bound < prev {
                warn!(
                    "{} bound decreased at iteration {}: {:.6} -> {:.6}",
                    self.name(),
                    iter,
                    prev,
                    bound
                );
                break;
            }
            prev = bound;
        }
        Ok(self.bound())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = OptimOptions::default();
        assert_eq!(opts.max_steps, 10);
        assert_eq!(opts.max_iters, 1000);
        assert_eq!(opts.l0, 1.0);
        assert_eq!(opts.dl, 0.1);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn setters_reject_non_positive_values() {
        let mut opts = OptimOptions::default();
        assert!(opts.set_max_steps(0).is_err());
        assert!(opts.set_max_iters(0).is_err());
        assert!(opts.set_lipschitz_init(0.0).is_err());
        assert!(opts.set_lipschitz_step(-0.5).is_err());
        assert!(opts.set_lipschitz_init(f64::NAN).is_err());
        assert_eq!(opts, OptimOptions::default());

        assert!(opts.set_lipschitz_init(1e-4).is_ok());
        assert_eq!(opts.l0, 1e-4);
    }

    #[test]
    fn options_from_json() -> anyhow::Result<()> {
        let opts = OptimOptions::from_json(r#"{ "max_iters": 50, "l0": 0.0001 }"#)?;
        assert_eq!(opts.max_iters, 50);
        assert_eq!(opts.l0, 1e-4);
        assert_eq!(opts.max_steps, 10);

        assert!(OptimOptions::from_json(r#"{ "dl": 0.0 }"#).is_err());
        assert!(OptimOptions::from_json("not json").is_err());

        let text = serde_json::to_string(&opts)?;
        assert_eq!(OptimOptions::from_json(&text)?, opts);
        Ok(())
    }
}
