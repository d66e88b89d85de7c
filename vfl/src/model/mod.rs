//! Models aggregate an array of posterior factors, their priors and a
//! dataset into a variational lower bound on the marginal likelihood.
//!
//! Every variant shares a Gaussian weight posterior with precision
//! `Sinv = sum_i c_i V(x_i) + nu I` and mean `wbar = s Sinv^{-1} h`,
//! `h = sum_i t_i phi(x_i)`. The variants differ in the per-observation
//! terms `(t_i, c_i)`, the scale `s`, and the bound they report.

mod tau_vfr;
mod vfc;
mod vfr;

pub use tau_vfr::TauVfr;
pub use vfc::Vfc;
pub use vfr::Vfr;

use crate::common::*;
use crate::data::{Datum, Dataset};
use crate::factor::{check_positive, Factor};
use matrix_util::chol;

/// Weight-posterior statistics and the factors they are computed from
#[derive(Clone, Debug)]
pub struct ModelCore {
    data: Dataset,
    factors: Vec<Box<dyn Factor>>,
    priors: Vec<Box<dyn Factor>>,
    nu: f64,
    h: DVec,
    sinv: Mat,
    l: Mat,
    sigma: Mat,
    wbar: DVec,
}

impl ModelCore {
    pub fn new(data: Dataset, nu: f64) -> anyhow::Result<Self> {
        check_positive("weight precision nu", nu)?;
        Ok(Self {
            data,
            factors: vec![],
            priors: vec![],
            nu,
            h: DVec::zeros(0),
            sinv: Mat::zeros(0, 0),
            l: Mat::zeros(0, 0),
            sigma: Mat::zeros(0, 0),
            wbar: DVec::zeros(0),
        })
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn factors(&self) -> &[Box<dyn Factor>] {
        &self.factors
    }

    pub fn priors(&self) -> &[Box<dyn Factor>] {
        &self.priors
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn nfactors(&self) -> usize {
        self.factors.len()
    }

    /// total number of weights `K`
    pub fn nweights(&self) -> usize {
        self.factors.iter().map(|f| f.nbasis()).sum()
    }

    /// index of the first weight of factor `j`
    pub fn weight_idx(&self, j: usize) -> usize {
        self.factors[..j].iter().map(|f| f.nbasis()).sum()
    }

    pub fn wbar(&self) -> &DVec {
        &self.wbar
    }

    pub fn sigma(&self) -> &Mat {
        &self.sigma
    }

    pub fn sinv(&self) -> &Mat {
        &self.sinv
    }

    pub fn chol_factor(&self) -> &Mat {
        &self.l
    }

    /// Append a factor; its prior is a copy of its current state
    pub fn add_factor(&mut self, f: Box<dyn Factor>) -> anyhow::Result<()> {
        if f.offset() + f.dims() > self.data.dims() {
            anyhow::bail!(
                "{} factor reads dimensions {}..{} of a {}-dimensional dataset",
                f.name(),
                f.offset(),
                f.offset() + f.dims(),
                self.data.dims()
            );
        }
        self.priors.push(f.clone());
        self.factors.push(f);
        Ok(())
    }

    /// Atomic parameter assignment of factor `j`
    pub fn set_factor_parms(&mut self, j: usize, x: &DVec) -> anyhow::Result<()> {
        match self.factors.get_mut(j) {
            Some(f) => f.set_parms(x),
            None => anyhow::bail!("model has {} factors, index {} given", self.factors.len(), j),
        }
    }

    /// Return every factor to its prior
    pub fn reset_factors(&mut self) {
        self.factors = self.priors.clone();
    }

    /// Finish a mean-field update of factor `j` from its accumulated
    /// gradient
    pub fn finalize_meanfield(&mut self, j: usize, acc: &DVec) -> anyhow::Result<()> {
        let prior = &self.priors[j];
        self.factors[j].meanfield_finalize(prior.as_ref(), acc)
    }

    /// whether the statistics match the current weight layout
    pub fn stats_ready(&self) -> bool {
        let kk = self.nweights();
        self.sigma.nrows() == kk && self.wbar.len() == kk && self.l.nrows() == kk
    }

    /// Expected basis functions of all factors at `x`
    pub fn phi(&self, x: &DVec) -> DVec {
        let mut phi = DVec::zeros(self.nweights());
        let mut k0 = 0;
        for f in &self.factors {
            for k in 0..f.nbasis() {
                phi[k0 + k] = f.mean(x, k);
            }
            k0 += f.nbasis();
        }
        phi
    }

    /// Second moment `V(x) = E[phi phi']`: products of means across
    /// factors and the factor's own `var` within its block
    pub fn second_moment(&self, x: &DVec, phi: &DVec) -> Mat {
        let mut v = phi * phi.transpose();
        let mut k0 = 0;
        for f in &self.factors {
            let kj = f.nbasis();
            for k in 0..kj {
                for k2 in 0..kj {
                    v[(k0 + k, k0 + k2)] = f.var(x, k, k2);
                }
            }
            k0 += kj;
        }
        v
    }

    /// rows of `V(x)` belonging to factor `j`
    fn moment_rows(&self, j: usize, x: &DVec, phi: &DVec) -> Mat {
        let k0 = self.weight_idx(j);
        let f = &self.factors[j];
        let kj = f.nbasis();
        let mut rows = Mat::zeros(kj, phi.len());
        for k in 0..kj {
            for k2 in 0..phi.len() {
                rows[(k, k2)] = if (k0..k0 + kj).contains(&k2) {
                    f.var(x, k, k2 - k0)
                } else {
                    phi[k0 + k] * phi[k2]
                };
            }
        }
        rows
    }

    /// Full recompute of the weight posterior from per-observation
    /// terms `(t_i, c_i)`
    pub fn infer_weights(&mut self, terms: &[(f64, f64)], scale: f64) -> anyhow::Result<()> {
        debug_assert_eq!(terms.len(), self.data.len());
        let kk = self.nweights();

        let mut h = DVec::zeros(kk);
        let mut sinv = Mat::identity(kk, kk) * self.nu;
        for (datum, &(t, c)) in self.data.iter().zip(terms.iter()) {
            let phi = self.phi(&datum.x);
            sinv += self.second_moment(&datum.x, &phi) * c;
            h.axpy(t, &phi, 1.0);
        }

        self.h = h;
        self.sinv = sinv;
        self.factorize(scale)
    }

    /// Refresh the statistics after factor `j` changed. Only the rows
    /// and columns of factor `j` are recomputed; the Cholesky factor and
    /// covariance follow by rank-1 updates and downdates, with a full
    /// re-factorization when those fail.
    pub fn update_weights(&mut self, j: usize, terms: &[(f64, f64)], scale: f64) -> anyhow::Result<()> {
        if !self.stats_ready() {
            return self.infer_weights(terms, scale);
        }

        let kk = self.nweights();
        let k0 = self.weight_idx(j);
        let kj = self.factors[j].nbasis();

        let mut rows = Mat::zeros(kj, kk);
        let mut hj = DVec::zeros(kj);
        for (datum, &(t, c)) in self.data.iter().zip(terms.iter()) {
            let phi = self.phi(&datum.x);
            rows += self.moment_rows(j, &datum.x, &phi) * c;
            hj.axpy(t, &phi.rows(k0, kj), 1.0);
        }
        for k in 0..kj {
            rows[(k, k0 + k)] += self.nu;
        }

        // symmetric change, each entry covered once
        let mut delta = &rows - self.sinv.rows(k0, kj);
        for r in 0..kj {
            for r2 in 0..r {
                delta[(r, k0 + r2)] = 0.0;
            }
            delta[(r, k0 + r)] *= 0.5;
        }

        // staged; committed only once the new factor is in hand
        let mut sinv = self.sinv.clone();
        sinv.rows_mut(k0, kj).copy_from(&rows);
        sinv.columns_mut(k0, kj).copy_from(&rows.transpose());
        let mut h = self.h.clone();
        h.rows_mut(k0, kj).copy_from(&hj);

        let (l, sigma) = match self.low_rank_adjust(k0, &delta) {
            Ok(stats) => stats,
            Err(e) => {
                debug!("factor {}: low-rank update failed ({}), refactorizing", j, e);
                let l = sinv.cholesky_lower()?;
                let sigma = chol::invert(&l);
                (l, sigma)
            }
        };

        self.wbar = chol::solve(&l, &h) * scale;
        self.l = l;
        self.sigma = sigma;
        self.sinv = sinv;
        self.h = h;
        Ok(())
    }

    /// Apply `Sinv += sum_r (e_r v_r' + v_r e_r')` to copies of `L` and
    /// `Sigma`, writing each term as `x x' - y y'`
    fn low_rank_adjust(&self, k0: usize, delta: &Mat) -> anyhow::Result<(Mat, Mat)> {
        let kk = self.sinv.nrows();
        let mut ups = vec![];
        let mut downs = vec![];
        for r in 0..delta.nrows() {
            let v = delta.row(r).transpose();
            let vnrm = v.norm();
            if vnrm == 0.0 {
                continue;
            }
            let alpha = (0.5 * vnrm).sqrt();
            let beta = 1.0 / vnrm;

            let mut e = DVec::zeros(kk);
            e[k0 + r] = 1.0;
            ups.push((&e + &v * beta) * alpha);
            downs.push((&e - &v * beta) * alpha);
        }

        let mut l = self.l.clone();
        let mut sigma = self.sigma.clone();
        for x in ups {
            sherman_morrison(&mut sigma, &x, 1.0)?;
            chol::update(&mut l, &mut x.clone())?;
        }
        for y in downs {
            sherman_morrison(&mut sigma, &y, -1.0)?;
            chol::downdate(&mut l, &mut y.clone())?;
        }

        if !l.iter().chain(sigma.iter()).all(|v| v.is_finite()) {
            anyhow::bail!("non-finite statistics after low-rank update");
        }
        Ok((l, sigma))
    }

    fn factorize(&mut self, scale: f64) -> anyhow::Result<()> {
        self.l = self.sinv.cholesky_lower()?;
        self.sigma = chol::invert(&self.l);
        self.wbar = chol::solve(&self.l, &self.h) * scale;
        Ok(())
    }

    /// `sum_k ln L_kk`, half the log-determinant of `Sinv`
    pub fn log_det_half(&self) -> f64 {
        self.l.diagonal().iter().map(|v| v.ln()).sum()
    }

    /// `||L' wbar||^2 = wbar' Sinv wbar`
    pub fn weight_energy(&self) -> f64 {
        (self.l.transpose() * &self.wbar).norm_squared()
    }

    /// `sum_j div(factor_j, prior_j)`
    pub fn divergence(&self) -> f64 {
        self.factors
            .iter()
            .zip(self.priors.iter())
            .map(|(f, p)| f.div(p.as_ref()))
            .sum()
    }

    /// `sum (a Sigma + b wbar wbar') o V`
    pub fn moment_trace(&self, v: &Mat, a: f64, b: f64) -> f64 {
        let w = &self.wbar;
        let mut ret = 0.0;
        for k in 0..v.nrows() {
            for k2 in 0..v.ncols() {
                ret += (a * self.sigma[(k, k2)] + b * w[k] * w[k2]) * v[(k, k2)];
            }
        }
        ret
    }

    /// First- and second-order coefficients of factor `j`'s expected
    /// basis functions in one observation's contribution to the bound:
    ///
    /// * `b_k = a w_k - c sum_{k2 not in j} M_{k,k2} phi_k2`
    /// * `B_kk' = -c/2 M_kk'`
    ///
    /// where `M = Sigma + r wbar wbar'`.
    pub fn coefficients(&self, j: usize, x: &DVec, a: f64, c: f64, r: f64) -> (DVec, Mat) {
        let k0 = self.weight_idx(j);
        let kj = self.factors[j].nbasis();
        let kk = self.wbar.len();
        let phi = self.phi(x);
        let w = &self.wbar;
        let m = |k: usize, k2: usize| self.sigma[(k, k2)] + r * w[k] * w[k2];

        let mut b = DVec::zeros(kj);
        let mut bb = Mat::zeros(kj, kj);
        for k in 0..kj {
            let mut s = 0.0;
            for k2 in (0..kk).filter(|k2| !(k0..k0 + kj).contains(k2)) {
                s += m(k0 + k, k2) * phi[k2];
            }
            b[k] = a * w[k0 + k] - c * s;
            for k2 in 0..kj {
                bb[(k, k2)] = -0.5 * c * m(k0 + k, k0 + k2);
            }
        }
        (b, bb)
    }
}

/// `Sigma <- (Sigma^{-1} + sign x x')^{-1}`
fn sherman_morrison(sigma: &mut Mat, x: &DVec, sign: f64) -> anyhow::Result<()> {
    let z = &*sigma * x;
    let denom = 1.0 + sign * x.dot(&z);
    if !denom.is_finite() || denom <= 0.0 {
        anyhow::bail!("rank-1 covariance update is singular");
    }
    *sigma -= (&z * z.transpose()) * (sign / denom);
    Ok(())
}

/// A variational model over a fixed dataset.
///
/// Implementors own a [`ModelCore`] and provide the per-observation
/// terms of their likelihood; inference, gradients, mean-field updates
/// and batch prediction are shared.
pub trait Model {
    fn core(&self) -> &ModelCore;

    fn core_mut(&mut self) -> &mut ModelCore;

    fn name(&self) -> &'static str;

    /// `(t_i, c_i)` for every observation: `h = sum t_i phi_i`,
    /// `Sinv = sum c_i V_i + nu I`
    fn precision_terms(&self) -> Vec<(f64, f64)>;

    /// `s` in `wbar = s Sinv^{-1} h`
    fn weight_scale(&self) -> f64;

    /// `(a_i, c_i)` of observation `i` in the gradient coefficients
    fn fit_terms(&self, i: usize) -> (f64, f64);

    /// `r` in `M = Sigma + r wbar wbar'`
    fn moment_scale(&self) -> f64;

    /// Full recompute of the weight posterior
    fn infer(&mut self) -> anyhow::Result<()>;

    /// Refresh the statistics after factor `j` changed
    fn update(&mut self, j: usize) -> anyhow::Result<()>;

    /// Variational lower bound at the current statistics
    fn bound(&self) -> f64;

    /// Predictive `(mean, variance)` at location `x`
    fn predict(&self, x: &DVec) -> (f64, f64);

    fn data(&self) -> &Dataset {
        self.core().data()
    }

    fn factors(&self) -> &[Box<dyn Factor>] {
        self.core().factors()
    }

    fn priors(&self) -> &[Box<dyn Factor>] {
        self.core().priors()
    }

    fn nfactors(&self) -> usize {
        self.core().nfactors()
    }

    fn weight_idx(&self, j: usize) -> usize {
        self.core().weight_idx(j)
    }

    fn add_factor(&mut self, f: Box<dyn Factor>) -> anyhow::Result<()> {
        self.core_mut().add_factor(f)
    }

    fn set_parms(&mut self, j: usize, x: &DVec) -> anyhow::Result<()> {
        self.core_mut().set_factor_parms(j, x)
    }

    /// Accumulate observation `i`'s contribution to the gradient of the
    /// bound with respect to the parameters of factor `j`
    fn gradient(&self, i: usize, j: usize, out: &mut DVec) {
        let core = self.core();
        let datum = &core.data()[i];
        let (a, c) = self.fit_terms(i);
        let (b, bb) = core.coefficients(j, &datum.x, a, c, self.moment_scale());
        core.factors()[j].meanfield_accumulate(&datum.x, &b, &bb, out);
    }

    /// Closed-form coordinate update of factor `j`. Statistics are left
    /// for the caller to refresh with [`Model::update`].
    fn meanfield(&mut self, j: usize) -> anyhow::Result<()> {
        let f = &self.factors()[j];
        if f.is_fixed() || f.npar() == 0 {
            return Ok(());
        }
        let mut acc = DVec::zeros(f.npar());
        for i in 0..self.data().len() {
            self.gradient(i, j, &mut acc);
        }
        self.core_mut().finalize_meanfield(j, &acc)
    }

    /// Predictions at every location of `grid`, as `(mean, variance)`
    /// datasets sharing the grid's locations
    fn predict_all(&self, grid: &Dataset) -> anyhow::Result<(Dataset, Dataset)> {
        let mut mean = Dataset::new(grid.dims());
        let mut var = Dataset::new(grid.dims());
        for datum in grid {
            let (m, v) = self.predict(&datum.x);
            mean.push(Datum::new(datum.p, datum.x.clone(), m))?;
            var.push(Datum::new(datum.p, datum.x.clone(), v))?;
        }
        Ok((mean, var))
    }

    /// Return every factor to its prior and re-infer
    fn reset(&mut self) -> anyhow::Result<()> {
        self.core_mut().reset_factors();
        self.infer()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::factor::Impulse;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    /// noisy `sinc` observations on `[-10, 10]`
    pub fn sinc_data(n: usize, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Dataset::new(1);
        for _ in 0..n {
            let x: f64 = -10.0 + 20.0 * rng.random::<f64>();
            let y = if x == 0.0 { 1.0 } else { x.sin() / x };
            let noise: f64 = rng.sample(StandardNormal);
            data.push(Datum::new(0, DVec::from_vec(vec![x]), y + 0.1 * noise))
                .expect("one-dimensional datum");
        }
        data
    }

    /// impulses spread over `[-8, 8]`
    pub fn impulses(m: usize, tau: f64) -> Vec<Box<dyn Factor>> {
        (0..m)
            .map(|j| {
                let mu = -8.0 + 16.0 * j as f64 / (m.max(2) - 1) as f64;
                Box::new(Impulse::new(mu, tau).expect("valid impulse")) as Box<dyn Factor>
            })
            .collect()
    }

    /// Compare the low-rank statistics after a change of factor `j`
    /// against a full recompute
    pub fn assert_update_matches_infer<M: Model + Clone>(model: &mut M, j: usize, x: &DVec) {
        use approx::assert_abs_diff_eq;

        model.infer().expect("infer");
        model.set_parms(j, x).expect("valid parameters");
        model.update(j).expect("update");

        let mut full = model.clone();
        let terms = full.precision_terms();
        let scale = full.weight_scale();
        full.core_mut().infer_weights(&terms, scale).expect("infer");

        let (a, b) = (model.core(), full.core());
        assert_abs_diff_eq!(a.sinv(), b.sinv(), epsilon = 1e-8);
        assert_abs_diff_eq!(a.sigma(), b.sigma(), epsilon = 1e-6);
        assert_abs_diff_eq!(a.chol_factor(), b.chol_factor(), epsilon = 1e-6);
        assert_abs_diff_eq!(a.wbar(), b.wbar(), epsilon = 1e-6);
    }
}
