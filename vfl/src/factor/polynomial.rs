use super::*;

/// Monomials `1, x_d, ..., x_d^order`; no parameters, never optimized
#[derive(Clone, Debug)]
pub struct Polynomial {
    state: FactorState,
}

impl Polynomial {
    pub fn new(order: usize) -> Self {
        let mut state = FactorState::new(1, 0, order + 1);
        state.fixed = true;
        Self { state }
    }

    pub fn order(&self) -> usize {
        self.state.nbasis - 1
    }

    pub fn set_order(&mut self, order: usize) -> anyhow::Result<()> {
        self.resize(order + 1)
    }
}

impl Factor for Polynomial {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "polynomial"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, i: usize) -> f64 {
        x[self.state.d].powi(i as i32)
    }

    fn var(&self, x: &DVec, i: usize, j: usize) -> f64 {
        let xd = x[self.state.d];
        xd.powi(i as i32) * xd.powi(j as i32)
    }

    fn diff_mean(&self, _x: &DVec, _i: usize, _df: &mut DVec) {}

    fn diff_var(&self, _x: &DVec, _i: usize, _j: usize, _df: &mut DVec) {}

    fn div(&self, _other: &dyn Factor) -> f64 {
        0.0
    }

    fn check(&self, p: usize, _value: f64) -> anyhow::Result<()> {
        anyhow::bail!("polynomial factors have no parameters, index {} given", p)
    }

    fn assign(&mut self, _p: usize, _value: f64) {}

    fn resize(&mut self, nbasis: usize) -> anyhow::Result<()> {
        if nbasis == 0 {
            anyhow::bail!("polynomial needs at least one basis function");
        }
        self.state.nbasis = nbasis;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn monomials() {
        let f = Polynomial::new(3);
        assert_eq!(f.nbasis(), 4);
        assert_eq!(f.npar(), 0);
        assert!(f.is_fixed());

        let x = DVec::from_vec(vec![3.0]);
        assert_abs_diff_eq!(f.mean(&x, 2), 9.0);
        assert_abs_diff_eq!(f.mean(&x, 0), 1.0);
        assert_abs_diff_eq!(f.var(&x, 1, 3), 81.0);
        assert_eq!(f.div(&f), 0.0);
    }

    #[test]
    fn resize_changes_basis_count() -> anyhow::Result<()> {
        let mut f = Polynomial::new(1);
        f.set_order(4)?;
        assert_eq!(f.nbasis(), 5);
        assert_eq!(f.order(), 4);
        assert!(f.resize(0).is_err());
        assert_eq!(f.nbasis(), 5);
        assert!(f.set(0, 1.0).is_err());
        Ok(())
    }
}
