use super::*;
use std::f64::consts::FRAC_PI_2;

const MU: usize = 0;
const TAU: usize = 1;

/// Pair of quadrature sinusoids `cos(w x_d)` and `cos(w x_d + pi/2)` with
/// a Gaussian posterior `w ~ N(mu, 1/tau)` on the frequency
#[derive(Clone, Debug)]
pub struct Cosine {
    state: FactorState,
}

impl Cosine {
    pub fn new(mu: f64, tau: f64) -> anyhow::Result<Self> {
        let mut ret = Self {
            state: FactorState::new(1, 2, 2),
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
}

impl Factor for Cosine {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "cosine"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, i: usize) -> f64 {
        let xd = x[self.state.d];
        let phase = FRAC_PI_2 * i as f64;
        (-0.5 * xd * xd / self.tau()).exp() * (self.mu() * xd + phase).cos()
    }

    fn var(&self, x: &DVec, i: usize, j: usize) -> f64 {
        let xd = x[self.state.d];
        let sum = FRAC_PI_2 * (i + j) as f64;
        let diff = FRAC_PI_2 * (i as f64 - j as f64);
        0.5 * ((-2.0 * xd * xd / self.tau()).exp() * (2.0 * self.mu() * xd + sum).cos() + diff.cos())
    }

    fn diff_mean(&self, x: &DVec, i: usize, df: &mut DVec) {
        let xd = x[self.state.d];
        let tau = self.tau();
        let theta = self.mu() * xd + FRAC_PI_2 * i as f64;
        let decay = (-0.5 * xd * xd / tau).exp();
        df[MU] = -xd * decay * theta.sin();
        df[TAU] = 0.5 * (xd * xd / (tau * tau)) * decay * theta.cos();
    }

    fn diff_var(&self, x: &DVec, i: usize, j: usize, df: &mut DVec) {
        let xp = 2.0 * x[self.state.d];
        let tau = self.tau();
        let theta = self.mu() * xp + FRAC_PI_2 * (i + j) as f64;
        let decay = (-0.5 * xp * xp / tau).exp();
        df[MU] = -0.5 * xp * decay * theta.sin();
        df[TAU] = 0.25 * (xp * xp / (tau * tau)) * decay * theta.cos();
    }

    fn div(&self, other: &dyn Factor) -> f64 {
        debug_assert_eq!(other.npar(), 2);
        gauss_div(self.mu(), self.tau(), other.par()[MU], other.par()[TAU])
    }

    fn check(&self, p: usize, value: f64) -> anyhow::Result<()> {
        match p {
            MU => check_finite("cosine frequency", value),
            TAU => check_positive("cosine precision", value),
            _ => anyhow::bail!("cosine parameter index {} out of range", p),
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
