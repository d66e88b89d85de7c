use super::*;

/// Regression with Gaussian noise of known precision `tau`; the weights
/// have prior precision `nu tau`.
#[derive(Clone, Debug)]
pub struct TauVfr {
    core: ModelCore,
    tau: f64,
}

impl TauVfr {
    pub fn new(data: Dataset, tau: f64, nu: f64) -> anyhow::Result<Self> {
        check_positive("noise precision tau", tau)?;
        Ok(Self {
            core: ModelCore::new(data, nu)?,
            tau,
        })
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn set_tau(&mut self, tau: f64) -> anyhow::Result<()> {
        check_positive("noise precision tau", tau)?;
        self.tau = tau;
        Ok(())
    }
}

impl Model for TauVfr {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "tauvfr"
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
        self.core.infer_weights(&terms, 1.0)
    }

    fn update(&mut self, j: usize) -> anyhow::Result<()> {
        let terms = self.precision_terms();
        self.core.update_weights(j, &terms, 1.0)
    }

    fn bound(&self) -> f64 {
        -self.core.log_det_half() + 0.5 * self.tau * self.core.weight_energy() - self.core.divergence()
    }

    fn predict(&self, x: &DVec) -> (f64, f64) {
        let phi = self.core.phi(x);
        let v = self.core.second_moment(x, &phi);
        let mean = self.core.wbar().dot(&phi);
        let tauinv = 1.0 / self.tau;
        let var = tauinv - mean * mean + self.core.moment_trace(&v, tauinv, 1.0);
        (mean, var)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::factor::{Factor, Polynomial};
    use approx::assert_abs_diff_eq;

    fn sinc_model(n: usize, m: usize) -> anyhow::Result<TauVfr> {
        let mut model = TauVfr::new(sinc_data(n, 11), 100.0, 1e-3)?;
        for f in impulses(m, 0.5) {
            model.add_factor(f)?;
        }
        Ok(model)
    }

    #[test]
    fn noise_precision_is_validated() -> anyhow::Result<()> {
        assert!(TauVfr::new(Dataset::new(1), 0.0, 1.0).is_err());
        let mut model = TauVfr::new(Dataset::new(1), 2.0, 1.0)?;
        assert!(model.set_tau(-1.0).is_err());
        assert_abs_diff_eq!(model.tau(), 2.0);
        Ok(())
    }

    #[test]
    fn linear_fit_is_exact_without_noise() -> anyhow::Result<()> {
        let mut data = Dataset::new(1);
        for i in 0..10 {
            let x = i as f64 * 0.5;
            data.push(Datum::new(0, DVec::from_vec(vec![x]), 2.0 - 3.0 * x))?;
        }
        let mut model = TauVfr::new(data, 1e6, 1e-8)?;
        model.add_factor(Box::new(Polynomial::new(1)))?;
        model.infer()?;

        assert_abs_diff_eq!(model.core().wbar()[0], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(model.core().wbar()[1], -3.0, epsilon = 1e-5);

        let (mean, var) = model.predict(&DVec::from_vec(vec![1.25]));
        assert_abs_diff_eq!(mean, 2.0 - 3.75, epsilon = 1e-5);
        assert!(var > 0.0 && var < 1e-4);
        Ok(())
    }

    #[test]
    fn low_rank_update_matches_infer() -> anyhow::Result<()> {
        let mut model = sinc_model(25, 4)?;
        let x = DVec::from_vec(vec![1.2, 2.5]);
        assert_update_matches_infer(&mut model, 0, &x);

        let mut full = model.clone();
        full.infer()?;
        assert_abs_diff_eq!(model.bound(), full.bound(), epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn bound_penalizes_divergence() -> anyhow::Result<()> {
        let mut model = sinc_model(10, 2)?;
        model.infer()?;
        assert_eq!(model.core().divergence(), 0.0);

        let x = DVec::from_vec(vec![-8.0, 0.25]);
        model.set_parms(0, &x)?;
        model.update(0)?;
        let div = model.core().divergence();
        assert!(div > 0.0);
        assert_abs_diff_eq!(
            model.bound(),
            -model.core().log_det_half() + 50.0 * model.core().weight_energy() - div,
            epsilon = 1e-9
        );
        assert_eq!(model.factors()[0].par(), &x);
        Ok(())
    }
}
