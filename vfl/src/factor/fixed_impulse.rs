use super::*;

const TAU: usize = 0;

/// Gaussian bump `exp(-tau/2 (x_d - mu)^2)` whose location `mu` is fixed
/// at construction; only the precision `tau` is a parameter
#[derive(Clone, Debug)]
pub struct FixedImpulse {
    state: FactorState,
    mu: f64,
}

impl FixedImpulse {
    pub fn new(mu: f64, tau: f64) -> anyhow::Result<Self> {
        check_finite("impulse location", mu)?;
        let mut ret = Self {
            state: FactorState::new(1, 1, 1),
            mu,
        };
        ret.set(TAU, tau)?;
        Ok(ret)
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn tau(&self) -> f64 {
        self.state.par[TAU]
    }
}

impl Factor for FixedImpulse {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "fixed-impulse"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, _i: usize) -> f64 {
        let u = x[self.state.d] - self.mu;
        (-0.5 * self.tau() * u * u).exp()
    }

    fn var(&self, x: &DVec, i: usize, _j: usize) -> f64 {
        self.mean(x, i)
    }

    fn diff_mean(&self, x: &DVec, i: usize, df: &mut DVec) {
        let u = x[self.state.d] - self.mu;
        df[TAU] = -0.5 * u * u * self.mean(x, i);
    }

    fn diff_var(&self, x: &DVec, i: usize, _j: usize, df: &mut DVec) {
        self.diff_mean(x, i, df);
    }

    fn div(&self, other: &dyn Factor) -> f64 {
        let mu2 = other
            .as_any()
            .downcast_ref::<FixedImpulse>()
            .map(|f| f.mu)
            .unwrap_or(self.mu);
        gauss_div(self.mu, self.tau(), mu2, other.par()[TAU])
    }

    fn check(&self, p: usize, value: f64) -> anyhow::Result<()> {
        match p {
            TAU => check_positive("impulse precision", value),
            _ => anyhow::bail!("fixed-impulse parameter index {} out of range", p),
        }
    }

    fn assign(&mut self, p: usize, value: f64) {
        self.state.par[p] = value;
        self.state.inf[(TAU, TAU)] = 0.75 / (value * value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::testing::check_gradients;
    use approx::assert_abs_diff_eq;

    #[test]
    fn only_precision_is_free() -> anyhow::Result<()> {
        let mut f = FixedImpulse::new(1.5, 2.0)?;
        assert_eq!(f.npar(), 1);
        assert_abs_diff_eq!(f.mean(&DVec::from_vec(vec![1.5]), 0), 1.0);
        assert_abs_diff_eq!(f.inf()[(0, 0)], 0.1875);

        assert!(f.set(0, 0.0).is_err());
        assert!(f.set(0, -1.0).is_err());
        assert_abs_diff_eq!(f.tau(), 2.0);

        f.set(0, 0.5)?;
        assert_abs_diff_eq!(f.inf()[(0, 0)], 3.0);
        assert_abs_diff_eq!(f.mu(), 1.5);
        Ok(())
    }

    #[test]
    fn divergence_uses_both_locations() -> anyhow::Result<()> {
        let f = FixedImpulse::new(1.0, 3.0)?;
        assert_eq!(f.div(&f), 0.0);

        let g = FixedImpulse::new(0.0, 3.0)?;
        assert_abs_diff_eq!(f.div(&g), 1.5, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn gradients_match_finite_differences() -> anyhow::Result<()> {
        let f = FixedImpulse::new(-0.2, 0.9)?;
        let xs: Vec<DVec> = [-2.0, -0.2, 1.0]
            .iter()
            .map(|&x| DVec::from_vec(vec![x]))
            .collect();
        check_gradients(&f, &xs);
        Ok(())
    }
}
