use super::*;
use crate::model::Model;
use matrix_util::chol;

/// Natural-gradient proximal line search, one factor at a time.
///
/// For factor `j` with parameters `xa`, prior parameters `x0` and
/// information matrix `F`, the full step is `xb = x0 + F^{-1} g` with
/// `g` the gradient of the expected fit. Proposals
/// `(xa + gamma xb) / (1 + gamma)` start at
/// `gamma = min_eigenvalue(F) / l0` and shrink by `dl` until the bound
/// increases; a factor with no accepted proposal is restored exactly.
pub struct FullGradient<'a, M: Model> {
    model: &'a mut M,
    opts: OptimOptions,
    bound0: f64,
    bound: f64,
}

impl<'a, M: Model> FullGradient<'a, M> {
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

    /// Line search over factor `j`; returns the bound afterwards
    fn search(&mut self, j: usize, bound_prev: f64) -> anyhow::Result<f64> {
        let model = &mut *self.model;

        let xa = model.factors()[j].par().clone();
        let mut xb = model.priors()[j].par().clone();
        let inf = model.factors()[j].inf().clone();

        let mut g = DVec::zeros(xa.len());
        for i in 0..model.data().len() {
            model.gradient(i, j, &mut g);
        }

        let fs = match inf.cholesky_lower() {
            Ok(fs) => fs,
            Err(e) => {
                debug!("factor {}: information matrix is singular ({})", j, e);
                return Ok(bound_prev);
            }
        };
        chol::solve_mut(&fs, &mut g);
        xb += &g;

        let mut gamma = inf.min_eigenvalue() / self.opts.l0;

        for step in 0..self.opts.max_steps {
            let x = &xa * (1.0 / (gamma + 1.0)) + &xb * (gamma / (gamma + 1.0));

            let accepted = match model.set_parms(j, &x).and_then(|_| model.update(j)) {
                Ok(()) => model.bound() > bound_prev,
                Err(e) => {
                    debug!("factor {}: step {} rejected ({})", j, step, e);
                    false
                }
            };

            if accepted {
                let bound = model.bound();
                debug!(
                    "factor {}: step {} accepted, bound {:.6} -> {:.6}",
                    j, step, bound_prev, bound
                );
                return Ok(bound);
            }
            gamma *= self.opts.dl;
        }

        debug!("factor {}: no step accepted after {} tries", j, self.opts.max_steps);
        model.set_parms(j, &xa)?;
        model.update(j)?;
        Ok(bound_prev)
    }
}

impl<M: Model> Optimizer for FullGradient<'_, M> {
    fn name(&self) -> &'static str {
        "full-gradient"
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

        let mut bound = self.bound0;
        for j in 0..self.model.nfactors() {
            let f = &self.model.factors()[j];
            if f.is_fixed() || f.npar() == 0 {
                continue;
            }
            bound = self.search(j, bound)?;
        }

        self.bound = bound;
        Ok(self.bound != self.bound0)
    }
}
