use super::*;

/// Binary classification, `y` in `{0, 1}`, under the Jaakkola-Jordan
/// quadratic bound on the logistic likelihood with one variational
/// parameter `xi_i` per observation
#[derive(Clone, Debug)]
pub struct Vfc {
    core: ModelCore,
    xi: DVec,
}

impl Vfc {
    pub fn new(data: Dataset, nu: f64) -> anyhow::Result<Self> {
        if let Some(d) = data.iter().find(|d| d.y != 0.0 && d.y != 1.0) {
            anyhow::bail!("classification labels must be 0 or 1, {} given", d.y);
        }
        let xi = DVec::from_element(data.len(), 1.0);
        Ok(Self {
            core: ModelCore::new(data, nu)?,
            xi,
        })
    }

    pub fn xi(&self) -> &DVec {
        &self.xi
    }

    /// `xi_i = sqrt(sum (Sigma + wbar wbar') o V(x_i))`
    fn refresh_xi(&mut self) {
        let core = &self.core;
        for (i, datum) in core.data().iter().enumerate() {
            let phi = core.phi(&datum.x);
            let v = core.second_moment(&datum.x, &phi);
            self.xi[i] = core.moment_trace(&v, 1.0, 1.0).max(0.0).sqrt();
        }
    }
}

/// logistic function
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `lambda(xi) = tanh(xi/2) / (4 xi)`, continuous at zero
fn lambda(xi: f64) -> f64 {
    if xi.abs() < 1e-8 {
        0.125
    } else {
        (0.5 * xi).tanh() / (4.0 * xi)
    }
}

fn ln_sigmoid(x: f64) -> f64 {
    if x < 0.0 {
        x - x.exp().ln_1p()
    } else {
        -(-x).exp().ln_1p()
    }
}

impl Model for Vfc {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "vfc"
    }

    fn precision_terms(&self) -> Vec<(f64, f64)> {
        self.core
            .data()
            .iter()
            .zip(self.xi.iter())
            .map(|(d, &xi)| (2.0 * d.y - 1.0, 2.0 * lambda(xi)))
            .collect()
    }

    fn weight_scale(&self) -> f64 {
        0.5
    }

    fn fit_terms(&self, i: usize) -> (f64, f64) {
        (self.core.data()[i].y - 0.5, 2.0 * lambda(self.xi[i]))
    }

    fn moment_scale(&self) -> f64 {
        1.0
    }

    /// The logistic parameters are refreshed from the current weight
    /// posterior first, then the posterior is recomputed under them.
    fn infer(&mut self) -> anyhow::Result<()> {
        if self.core.stats_ready() {
            self.refresh_xi();
        }
        let terms = self.precision_terms();
        self.core.infer_weights(&terms, 0.5)
    }

    /// Logistic parameters stay fixed between calls to `infer`.
    fn update(&mut self, j: usize) -> anyhow::Result<()> {
        let terms = self.precision_terms();
        self.core.update_weights(j, &terms, 0.5)
    }

    fn bound(&self) -> f64 {
        let logistic: f64 = self
            .xi
            .iter()
            .map(|&xi| ln_sigmoid(xi) - 0.5 * xi + lambda(xi) * xi * xi)
            .sum();
        -self.core.log_det_half() + 0.5 * self.core.weight_energy() + logistic - self.core.divergence()
    }

    fn predict(&self, x: &DVec) -> (f64, f64) {
        let phi = self.core.phi(x);
        let p = sigmoid(self.core.wbar().dot(&phi));
        (p, p * (1.0 - p))
    }
}
