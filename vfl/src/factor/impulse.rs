use super::*;

const MU: usize = 0;
const TAU: usize = 1;

/// Gaussian bump `exp(-tau/2 (x_d - mu)^2)` with location `mu` and
/// precision `tau`
#[derive(Clone, Debug)]
pub struct Impulse {
    state: FactorState,
}

impl Impulse {
    pub fn new(mu: f64, tau: f64) -> anyhow::Result<Self> {
        let mut ret = Self {
            state: FactorState::new(1, 2, 1),
        };
        ret.set(MU, mu)?;
        ret.set(TAU, tau)?;
        Ok(ret)
    }

    pub fn mu(&self) -> f64 {
        self.state.par[MU]
    }

    pub fn tau(&self) -> f64 {
        self.state.par[TAU]
    }

    fn offset_from_mu(&self, x: &DVec) -> f64 {
        x[self.state.d] - self.mu()
    }
}

impl Factor for Impulse {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "impulse"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, _i: usize) -> f64 {
        let u = self.offset_from_mu(x);
        (-0.5 * self.tau() * u * u).exp()
    }

    fn var(&self, x: &DVec, i: usize, _j: usize) -> f64 {
        self.mean(x, i)
    }

    fn diff_mean(&self, x: &DVec, i: usize, df: &mut DVec) {
        let u = self.offset_from_mu(x);
        let m = self.mean(x, i);
        df[MU] = self.tau() * u * m;
        df[TAU] = -0.5 * u * u * m;
    }

    fn diff_var(&self, x: &DVec, i: usize, _j: usize, df: &mut DVec) {
        self.diff_mean(x, i, df);
    }

    fn div(&self, other: &dyn Factor) -> f64 {
        debug_assert_eq!(other.npar(), 2);
        gauss_div(self.mu(), self.tau(), other.par()[MU], other.par()[TAU])
    }

    fn check(&self, p: usize, value: f64) -> anyhow::Result<()> {
        match p {
            MU => check_finite("impulse location", value),
            TAU => check_positive("impulse precision", value),
            _ => anyhow::bail!("impulse parameter index {} out of range", p),
        }
    }

    fn assign(&mut self, p: usize, value: f64) {
        self.state.par[p] = value;
        if p == TAU {
            self.state.inf[(MU, MU)] = value;
            self.state.inf[(TAU, TAU)] = 0.75 / (value * value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::testing::check_gradients;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_at_known_points() -> anyhow::Result<()> {
        let f = Impulse::new(0.0, 1.0)?;
        assert_abs_diff_eq!(f.mean(&DVec::from_vec(vec![0.0]), 0), 1.0);

        let f = Impulse::new(0.0, 4.0)?;
        assert_abs_diff_eq!(f.mean(&DVec::from_vec(vec![1.0]), 0), (-2_f64).exp());
        assert_abs_diff_eq!(f.mean(&DVec::from_vec(vec![1.0]), 0), 0.1353353, epsilon = 1e-7);
        Ok(())
    }

    #[test]
    fn reads_its_own_coordinate() -> anyhow::Result<()> {
        let mut f = Impulse::new(1.0, 2.0)?;
        f.set_offset(2);
        let x = DVec::from_vec(vec![100.0, -100.0, 1.0]);
        assert_abs_diff_eq!(f.mean(&x, 0), 1.0);
        Ok(())
    }

    #[test]
    fn information_follows_precision() -> anyhow::Result<()> {
        let mut f = Impulse::new(0.5, 2.0)?;
        assert_abs_diff_eq!(f.inf()[(0, 0)], 2.0);
        assert_abs_diff_eq!(f.inf()[(1, 1)], 0.75 / 4.0);

        f.set(1, 0.5)?;
        assert_abs_diff_eq!(f.inf()[(0, 0)], 0.5);
        assert_abs_diff_eq!(f.inf()[(1, 1)], 3.0);
        assert_abs_diff_eq!(f.inf()[(0, 1)], 0.0);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_precision() -> anyhow::Result<()> {
        let mut f = Impulse::new(0.3, 1.5)?;
        let before = f.state().clone();

        assert!(f.set(1, 0.0).is_err());
        assert!(f.set(1, -1.0).is_err());
        assert!(f.set(0, f64::NAN).is_err());
        assert!(f.set(2, 1.0).is_err());
        assert_eq!(f.state(), &before);

        assert!(f.set_parms(&DVec::from_vec(vec![9.0, -1.0])).is_err());
        assert_eq!(f.state(), &before);

        f.set_parms(&DVec::from_vec(vec![9.0, 3.0]))?;
        assert_abs_diff_eq!(f.mu(), 9.0);
        assert_abs_diff_eq!(f.tau(), 3.0);
        Ok(())
    }

    #[test]
    fn divergence() -> anyhow::Result<()> {
        let f = Impulse::new(0.7, 2.5)?;
        assert_eq!(f.div(&f), 0.0);

        let g = Impulse::new(0.0, 1.0)?;
        // KL(N(0.7, 1/2.5) || N(0, 1))
        let expected = 0.5 * (1.0 / 2.5 + 0.49) - 0.5 * (1.0 / 2.5_f64).ln() - 0.5;
        assert_abs_diff_eq!(f.div(&g), expected, epsilon = 1e-12);
        assert!(f.div(&g) > 0.0);
        Ok(())
    }

    #[test]
    fn gradients_match_finite_differences() -> anyhow::Result<()> {
        let f = Impulse::new(0.4, 1.7)?;
        let xs: Vec<DVec> = [-1.0, 0.0, 0.3, 2.0]
            .iter()
            .map(|&x| DVec::from_vec(vec![x]))
            .collect();
        check_gradients(&f, &xs);
        Ok(())
    }
}
