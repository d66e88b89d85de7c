use super::*;
use crate::model::Model;

/// Coordinate ascent over the factors by closed-form mean-field updates.
///
/// Only the leading factors whose cumulative basis count stays below the
/// number of observations are updated.
pub struct MeanField<'a, M: Model> {
    model: &'a mut M,
    opts: OptimOptions,
    bound0: f64,
    bound: f64,
}

impl<'a, M: Model> MeanField<'a, M> {
    pub fn new(model: &'a mut M, opts: OptimOptions) -> anyhow::Result<Self> {
        opts.validate()?;
        Ok(Self {
            model,
            opts,
            bound0: f64::NEG_INFINITY,
            bound: f64::NEG_INFINITY,
        })
    }

    pub fn model(&self) -> &M {
        self.model
    }

    /// number of leading factors eligible for an update
    fn num_eligible(&self) -> usize {
        let nn = self.model.data().len();
        let mut ktot = 0;
        for (j, f) in self.model.factors().iter().enumerate() {
            if ktot + f.nbasis() >= nn {
                return j;
            }
            ktot += f.nbasis();
        }
        self.model.nfactors()
    }
}

impl<M: Model> Optimizer for MeanField<'_, M> {
    fn name(&self) -> &'static str {
        "mean-field"
    }

    fn options(&self) -> &OptimOptions {
        &self.opts
    }

    fn initial_bound(&self) -> f64 {
        self.bound0
    }

    fn bound(&self) -> f64 {
        self.bound
    }

    fn iterate(&mut self) -> anyhow::Result<bool> {
        self.model.infer()?;
        self.bound0 = self.model.bound();
        self.bound = self.bound0;

        for j in 0..self.num_eligible() {
            match self.model.meanfield(j) {
                Ok(()) => self.model.update(j)?,
                Err(e) => debug!("factor {}: mean-field update failed ({})", j, e),
            }
            self.bound = self.model.bound();
        }

        Ok(self.bound != self.bound0)
    }
}
