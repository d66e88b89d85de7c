use super::*;

/// Product of sub-factors. Sub-factor `n` reads the location starting at
/// its own offset relative to the product; basis function `i` pairs with
/// sub-basis `i mod K_n`. Parameters are the concatenation of the
/// sub-factor parameters and the information matrix is block diagonal.
#[derive(Clone, Debug)]
pub struct Product {
    state: FactorState,
    parts: Vec<Box<dyn Factor>>,
    /// offset of each part relative to the product's own offset
    rel: Vec<usize>,
    /// first parameter index of each part
    poff: Vec<usize>,
}

impl Product {
    pub fn new(parts: Vec<(usize, Box<dyn Factor>)>) -> anyhow::Result<Self> {
        if parts.is_empty() {
            anyhow::bail!("product needs at least one sub-factor");
        }

        let mut rel = Vec::with_capacity(parts.len());
        let mut poff = Vec::with_capacity(parts.len());
        let mut factors = Vec::with_capacity(parts.len());

        let (mut dims, mut nbasis, mut npar) = (0, 0, 0);
        for (d, mut f) in parts {
            f.set_offset(d);
            dims = dims.max(d + f.dims());
            nbasis = nbasis.max(f.nbasis());
            rel.push(d);
            poff.push(npar);
            npar += f.npar();
            factors.push(f);
        }

        let mut state = FactorState::new(dims, npar, nbasis);
        state.fixed = factors.iter().all(|f| f.is_fixed());

        let mut ret = Self {
            state,
            parts: factors,
            rel,
            poff,
        };
        for n in 0..ret.parts.len() {
            ret.copy_block(n);
        }
        Ok(ret)
    }

    pub fn parts(&self) -> &[Box<dyn Factor>] {
        &self.parts
    }

    /// sub-factor owning parameter `p` and the local index within it
    fn locate(&self, p: usize) -> Option<(usize, usize)> {
        self.parts
            .iter()
            .zip(self.poff.iter())
            .position(|(f, &o)| p >= o && p < o + f.npar())
            .map(|n| (n, p - self.poff[n]))
    }

    fn copy_block(&mut self, n: usize) {
        let (p0, pn) = (self.poff[n], self.parts[n].npar());
        let f = &self.parts[n];
        self.state.par.rows_mut(p0, pn).copy_from(f.par());
        self.state
            .inf
            .view_mut((p0, p0), (pn, pn))
            .copy_from(f.inf());
    }

    /// Product rule: the block of part `n` is its own gradient times the
    /// other parts' values
    fn product_rule<V, D>(&self, value: V, diff: D, df: &mut DVec)
    where
        V: Fn(&dyn Factor) -> f64,
        D: Fn(&dyn Factor, &mut DVec),
    {
        let values: Vec<f64> = self.parts.iter().map(|f| value(f.as_ref())).collect();
        for (n, f) in self.parts.iter().enumerate() {
            let pn = f.npar();
            if pn == 0 {
                continue;
            }
            let others: f64 = values
                .iter()
                .enumerate()
                .filter(|&(m, _)| m != n)
                .map(|(_, v)| v)
                .product();
            let mut g = DVec::zeros(pn);
            diff(f.as_ref(), &mut g);
            df.rows_mut(self.poff[n], pn).copy_from(&(g * others));
        }
    }
}

impl Factor for Product {
    fn state(&self) -> &FactorState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactorState {
        &mut self.state
    }

    fn name(&self) -> &'static str {
        "product"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn box_clone(&self) -> Box<dyn Factor> {
        Box::new(self.clone())
    }

    fn mean(&self, x: &DVec, i: usize) -> f64 {
        self.parts
            .iter()
            .map(|f| f.mean(x, i % f.nbasis()))
            .product()
    }

    fn var(&self, x: &DVec, i: usize, j: usize) -> f64 {
        self.parts
            .iter()
            .map(|f| {
                let kn = f.nbasis();
                f.var(x, i % kn, j % kn)
            })
            .product()
    }

    fn diff_mean(&self, x: &DVec, i: usize, df: &mut DVec) {
        self.product_rule(
            |f| f.mean(x, i % f.nbasis()),
            |f, g| f.diff_mean(x, i % f.nbasis(), g),
            df,
        );
    }

    fn diff_var(&self, x: &DVec, i: usize, j: usize, df: &mut DVec) {
        self.product_rule(
            |f| f.var(x, i % f.nbasis(), j % f.nbasis()),
            |f, g| f.diff_var(x, i % f.nbasis(), j % f.nbasis(), g),
            df,
        );
    }

    fn div(&self, other: &dyn Factor) -> f64 {
        match other.as_any().downcast_ref::<Product>() {
            Some(other) if other.parts.len() == self.parts.len() => self
                .parts
                .iter()
                .zip(other.parts.iter())
                .map(|(f, g)| f.div(g.as_ref()))
                .sum(),
            _ => f64::NAN,
        }
    }

    fn check(&self, p: usize, value: f64) -> anyhow::Result<()> {
        match self.locate(p) {
            Some((n, local)) => self.parts[n].check(local, value),
            None => anyhow::bail!("product parameter index {} out of range", p),
        }
    }

    fn assign(&mut self, p: usize, value: f64) {
        if let Some((n, local)) = self.locate(p) {
            self.parts[n].assign(local, value);
            self.copy_block(n);
        }
    }

    fn set_offset(&mut self, d: usize) {
        self.state.d = d;
        for (f, &r) in self.parts.iter_mut().zip(self.rel.iter()) {
            f.set_offset(d + r);
        }
    }
}
