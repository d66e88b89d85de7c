use super::*;

/// Regression with Gaussian noise whose precision `tau` carries a
/// conjugate `Gamma(alpha0, beta0)` prior; the weights have prior
/// precision `nu tau`.
#[derive(Clone, Debug)]
pub struct Vfr {
    core: ModelCore,
    alpha0: f64,
    beta0: f64,
    alpha: f64,
    beta: f64,
    tau: f64,
}

impl Vfr {
    pub fn new(data: Dataset, alpha0: f64, beta0: f64, nu: f64) -> anyhow::Result<Self> {
        check_positive("noise shape alpha0", alpha0)?;
        check_positive("noise rate beta0", beta0)?;
        Ok(Self {
            core: ModelCore::new(data, nu)?,
            alpha0,
            beta0,
            alpha: alpha0,
            beta: beta0,
            tau: alpha0 / beta0,
        })
    }

    /// `alpha0 = beta0 = nu = 1`
    pub fn with_defaults(data: Dataset) -> anyhow::Result<Self> {
        Self::new(data, 1.0, 1.0, 1.0)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// `E[tau] = alpha/beta`
    pub fn tau(&self) -> f64 {
        self.tau
    }

    fn refresh_noise(&mut self) {
        let data = self.core.data();
        self.alpha = self.alpha0 + 0.5 * data.len() as f64;
        self.beta = self.beta0 + 0.5 * (data.inner() - self.core.weight_energy());
        self.tau = self.alpha / self.beta;
    }
}

impl Model for Vfr {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "vfr"
    }

    fn precision_terms(&self) -> Vec<(f64, f64)> {
        self.core.data().iter().map(|d| (d.y, 1.0)).collect()
    }

    fn weight_scale(&self) -> f64 {
        1.0
    }

    fn fit_terms(&self, i: usize) -> (f64, f64) {
        (self.tau * self.core.data()[i].y, 1.0)
    }

    fn moment_scale(&self) -> f64 {
        self.tau
    }

    fn infer(&mut self) -> anyhow::Result<()> {
        let terms = self.precision_terms();
        self.core.infer_weights(&terms, 1.0)?;
        self.refresh_noise();
        Ok(())
    }

    fn update(&mut self, j: usize) -> anyhow::Result<()> {
        let terms = self.precision_terms();
        self.core.update_weights(j, &terms, 1.0)?;
        self.refresh_noise();
        if !self.beta.is_finite() {
            debug!("noise rate is not finite after updating factor {}, re-inferring", j);
            return self.infer();
        }
        Ok(())
    }

    fn bound(&self) -> f64 {
        -self.core.log_det_half() - self.alpha * self.beta.ln() - self.core.divergence()
    }

    fn predict(&self, x: &DVec) -> (f64, f64) {
        let phi = self.core.phi(x);
        let v = self.core.second_moment(x, &phi);
        let mean = self.core.wbar().dot(&phi);
        let tauinv = self.beta / (self.alpha - 1.0);
        let var = tauinv - mean * mean + self.core.moment_trace(&v, tauinv, 1.0);
        (mean, var)
    }
}
