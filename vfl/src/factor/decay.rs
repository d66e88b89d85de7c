use super::*;
use special::Gamma as SpecialGamma;

const ALPHA: usize = 0;
const BETA: usize = 1;

/// Decay `exp(-r x_d)` with a gamma posterior `r ~ Gamma(alpha, beta)`
/// (shape, rate) on the rate, so that `E[exp(-r x)] = (beta/(beta+x))^alpha`.
///
/// Locations must satisfy `x_d > -beta/2`.
#[derive(Clone, Debug)]
pub struct Decay {
    state: FactorState,
}

impl Decay {
    pub fn new(alpha: f64, beta: f64) -> anyhow::Result<Self> {
        check_positive("decay shape", alpha)?;
        check_positive("decay rate", beta)?;
        let mut ret = Self {
            state: FactorState::new(1, 2, 1),
        };
        ret.state.par[ALPHA] = alpha;
        ret.state.par[BETA] = beta;
        ret.refresh_information();
        Ok(ret)
    }

    pub fn alpha(&self) -> f64 {
        self.state.par[ALPHA]
    }

    pub fn beta(&self) -> f64 {
        self.state.par[BETA]
    }

    /// Fisher information of the gamma distribution
    fn refresh_information(&mut self) {
        let (a, b) = (self.alpha(), self.beta());
        let inf = &mut self.state.inf;
        inf[(ALPHA, ALPHA)] = SpecialGamma::trigamma(&a);
        inf[(ALPHA, BETA)] = -1.0 / b;
        inf[(BETA, ALPHA)] = -1.0 / b;
        inf[(BETA, BETA)] = a / (b * b);
    }

    fn expectation(&self, x: f64) -> f64 {
        (self.beta() / (self.beta() + x)).powf(self.alpha())
    }

    fn diff_expectation(&self, x: f64, df: &mut DVec) {
        let (a, b) = (self.alpha(), self.beta());
        let ratio = b / (b + x);
        let m = ratio.powf(a);
        df[ALPHA] = m * ratio.ln();
        df[BETA] = m * a * x / (b * (b + x));
    }
}

impl Factor for Decay {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "decay"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, _i: usize) -> f64 {
        self.expectation(x[self.state.d])
    }

    fn var(&self, x: &DVec, _i: usize, _j: usize) -> f64 {
        self.expectation(2.0 * x[self.state.d])
    }

    fn diff_mean(&self, x: &DVec, _i: usize, df: &mut DVec) {
        self.diff_expectation(x[self.state.d], df);
    }

    fn diff_var(&self, x: &DVec, _i: usize, _j: usize, df: &mut DVec) {
        self.diff_expectation(2.0 * x[self.state.d], df);
    }

    /// KL divergence between gamma distributions
    fn div(&self, other: &dyn Factor) -> f64 {
        debug_assert_eq!(other.npar(), 2);
        let (a, b) = (self.alpha(), self.beta());
        let (a2, b2) = (other.par()[ALPHA], other.par()[BETA]);

        (a - a2) * SpecialGamma::digamma(a) - SpecialGamma::ln_gamma(a).0
            + SpecialGamma::ln_gamma(a2).0
            + a2 * (b.ln() - b2.ln())
            + a * (b2 - b) / b
    }

    fn check(&self, p: usize, value: f64) -> anyhow::Result<()> {
        match p {
            ALPHA => check_positive("decay shape", value),
            BETA => check_positive("decay rate", value),
            _ => anyhow::bail!("decay parameter index {} out of range", p),
        }
    }

    fn assign(&mut self, p: usize, value: f64) {
        self.state.par[p] = value;
        self.refresh_information();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::testing::check_gradients;
    use approx::assert_abs_diff_eq;

    #[test]
    fn shape_information_is_trigamma() -> anyhow::Result<()> {
        let pi2 = std::f64::consts::PI.powi(2);
        for (a, expected) in [(1.0, pi2 / 6.0), (0.5, pi2 / 2.0), (2.0, pi2 / 6.0 - 1.0)] {
            let f = Decay::new(a, 3.0)?;
            assert_abs_diff_eq!(f.inf()[(ALPHA, ALPHA)], expected, epsilon = 1e-10);
        }
        Ok(())
    }

    #[test]
    fn expectation_of_gamma_rate() -> anyhow::Result<()> {
        let f = Decay::new(2.0, 3.0)?;
        let x = DVec::from_vec(vec![1.0]);
        assert_abs_diff_eq!(f.mean(&x, 0), (0.75_f64).powi(2), epsilon = 1e-12);
        assert_abs_diff_eq!(f.var(&x, 0, 0), (0.6_f64).powi(2), epsilon = 1e-12);
        assert_abs_diff_eq!(f.mean(&DVec::from_vec(vec![0.0]), 0), 1.0);
        Ok(())
    }

    #[test]
    fn information_and_validation() -> anyhow::Result<()> {
        let mut f = Decay::new(1.0, 2.0)?;
        assert_abs_diff_eq!(f.inf()[(0, 1)], -0.5);
        assert_abs_diff_eq!(f.inf()[(1, 1)], 0.25);
        assert!(f.inf().cholesky_lower().is_ok());

        assert!(f.set(0, 0.0).is_err());
        assert!(f.set(1, -2.0).is_err());
        assert!(Decay::new(-1.0, 1.0).is_err());

        f.set(1, 4.0)?;
        assert_abs_diff_eq!(f.inf()[(1, 0)], -0.25);
        assert_abs_diff_eq!(f.inf()[(1, 1)], 1.0 / 16.0);
        Ok(())
    }

    #[test]
    fn gamma_divergence() -> anyhow::Result<()> {
        let f = Decay::new(2.5, 0.7)?;
        assert_eq!(f.div(&f), 0.0);

        // same shape, twice the rate: a (1 - ln 2)
        let g = Decay::new(2.5, 1.4)?;
        assert_abs_diff_eq!(f.div(&g), 2.5 * (1.0 - 2_f64.ln()), epsilon = 1e-12);
        assert!(g.div(&f) > 0.0);
        Ok(())
    }

    #[test]
    fn gradients_match_finite_differences() -> anyhow::Result<()> {
        let f = Decay::new(1.8, 0.6)?;
        let xs: Vec<DVec> = [0.0, 0.5, 3.0]
            .iter()
            .map(|&x| DVec::from_vec(vec![x]))
            .collect();
        check_gradients(&f, &xs);
        Ok(())
    }
}
