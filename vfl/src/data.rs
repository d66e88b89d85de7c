use crate::common::*;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// A single observation `y` of output stream `p` at location `x`
#[derive(Clone, Debug, PartialEq)]
pub struct Datum {
    pub p: usize,
    pub x: DVec,
    pub y: f64,
}

impl Datum {
    pub fn new(p: usize, x: DVec, y: f64) -> Self {
        Self { p, x, y }
    }

    /// Strict total order: output index first, then locations
    /// lexicographically
    pub fn order(&self, other: &Self) -> Ordering {
        self.p.cmp(&other.p).then_with(|| {
            for (a, b) in self.x.iter().zip(other.x.iter()) {
                match a.total_cmp(b) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            self.x.len().cmp(&other.x.len())
        })
    }
}

/// Observations kept sorted by [`Datum::order`] at all times.
///
/// Every datum carries a location of the same dimension `dims`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    data: Vec<Datum>,
    dims: usize,
}

impl Dataset {
    pub fn new(dims: usize) -> Self {
        Self {
            data: vec![],
            dims,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// location dimension of every datum
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn get(&self, i: usize) -> Option<&Datum> {
        self.data.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[Datum] {
        &self.data
    }

    /// Insert a datum at its sorted position
    pub fn push(&mut self, datum: Datum) -> anyhow::Result<()> {
        if datum.x.len() != self.dims {
            anyhow::bail!(
                "datum location has {} dimensions, dataset expects {}",
                datum.x.len(),
                self.dims
            );
        }
        self.data.push(datum);
        self.sort_last();
        Ok(())
    }

    /// Insert every datum of `other`
    pub fn augment(&mut self, other: &Dataset) -> anyhow::Result<()> {
        if other.dims != self.dims && !other.is_empty() {
            anyhow::bail!(
                "cannot augment a {}-dimensional dataset with {}-dimensional data",
                self.dims,
                other.dims
            );
        }
        self.data.reserve(other.len());
        for datum in other.iter() {
            self.data.push(datum.clone());
            self.sort_last();
        }
        Ok(())
    }

    /// Zero-valued observations of output `p` on a regular grid.
    ///
    /// * `grid` - one `(min, step, max)` triple per location dimension;
    ///   axis `d` takes `floor((max - min) / step) + 1` values and the
    ///   first axis varies fastest
    pub fn from_grid(p: usize, grid: &[(f64, f64, f64)]) -> anyhow::Result<Self> {
        let mut ret = Dataset::new(grid.len());
        ret.augment_from_grid(p, grid)?;
        Ok(ret)
    }

    /// Append a grid of zero-valued observations (see [`Dataset::from_grid`])
    pub fn augment_from_grid(&mut self, p: usize, grid: &[(f64, f64, f64)]) -> anyhow::Result<()> {
        if grid.len() != self.dims {
            anyhow::bail!("grid has {} axes, dataset expects {}", grid.len(), self.dims);
        }

        let mut sizes = Vec::with_capacity(grid.len());
        for (d, &(lb, step, ub)) in grid.iter().enumerate() {
            if !(lb.is_finite() && ub.is_finite() && step.is_finite()) || step <= 0.0 || ub < lb {
                anyhow::bail!("invalid grid axis {}: ({}, {}, {})", d, lb, step, ub);
            }
            sizes.push(((ub - lb) / step).floor() as usize + 1);
        }

        let ntot: usize = sizes.iter().product();
        let mut idx = vec![0_usize; grid.len()];
        let mut grid_data = Dataset::new(self.dims);
        grid_data.data.reserve(ntot);

        for _ in 0..ntot {
            let x = DVec::from_iterator(
                grid.len(),
                grid.iter()
                    .zip(idx.iter())
                    .map(|(&(lb, step, _), &k)| lb + (k as f64) * step),
            );
            grid_data.data.push(Datum::new(p, x, 0.0));

            for (k, &sz) in idx.iter_mut().zip(sizes.iter()) {
                *k += 1;
                if *k < sz {
                    break;
                }
                *k = 0;
            }
        }

        // grid points come out sorted only along the slowest axis
        grid_data.data.sort_by(|a, b| a.order(b));
        self.augment(&grid_data)
    }

    /// `sum_i y_i^2`
    pub fn inner(&self) -> f64 {
        self.data.iter().map(|d| d.y * d.y).sum()
    }

    pub fn is_sorted(&self) -> bool {
        self.data
            .windows(2)
            .all(|w| w[0].order(&w[1]) != Ordering::Greater)
    }

    /// Move the last element down to its sorted position, assuming the
    /// rest is already sorted
    fn sort_last(&mut self) {
        let mut i = self.data.len();
        while i > 1 && self.data[i - 2].order(&self.data[i - 1]) == Ordering::Greater {
            self.data.swap(i - 2, i - 1);
            i -= 1;
        }
    }
}

impl Index<usize> for Dataset {
    type Output = Datum;

    fn index(&self, i: usize) -> &Datum {
        &self.data[i]
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Datum;
    type IntoIter = std::slice::Iter<'a, Datum>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

/// Text format: a header `# <N> <D>` followed by `N` lines of
/// `<p> <x_1> ... <x_D> <y>`
impl FromStr for Dataset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty dataset text"))?;
        let words: Vec<&str> = header.split_whitespace().collect();
        if words.len() != 3 || words[0] != "#" {
            anyhow::bail!("expected header `# <N> <D>`, found `{}`", header);
        }
        let nn: usize = words[1].parse()?;
        let dd: usize = words[2].parse()?;

        let mut ret = Dataset::new(dd);
        ret.data.reserve(nn);

        for (i, line) in lines.enumerate() {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.len() != dd + 2 {
                anyhow::bail!(
                    "line {} has {} fields, expected {}",
                    i + 1,
                    words.len(),
                    dd + 2
                );
            }
            let p: usize = words[0].parse()?;
            let x = words[1..=dd]
                .iter()
                .map(|w| w.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()?;
            let y: f64 = words[dd + 1].parse()?;
            ret.push(Datum::new(p, DVec::from_vec(x), y))?;
        }

        if ret.len() != nn {
            anyhow::bail!("header declares {} observations, found {}", nn, ret.len());
        }
        Ok(ret)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {} {}", self.len(), self.dims)?;
        for datum in &self.data {
            write!(f, "{}", datum.p)?;
            for x in datum.x.iter() {
                write!(f, " {}", x)?;
            }
            writeln!(f, " {}", datum.y)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(p: usize, x: &[f64], y: f64) -> Datum {
        Datum::new(p, DVec::from_row_slice(x), y)
    }

    #[test]
    fn insertion_keeps_order() -> anyhow::Result<()> {
        let mut dat = Dataset::new(1);
        dat.push(datum(1, &[2.0], 0.0))?;
        dat.push(datum(0, &[5.0], 0.0))?;
        dat.push(datum(1, &[1.0], 0.0))?;

        let keys: Vec<(usize, f64)> = dat.iter().map(|d| (d.p, d.x[0])).collect();
        assert_eq!(keys, vec![(0, 5.0), (1, 1.0), (1, 2.0)]);
        assert!(dat.is_sorted());
        Ok(())
    }

    #[test]
    fn lexicographic_locations() -> anyhow::Result<()> {
        let mut dat = Dataset::new(2);
        dat.push(datum(0, &[1.0, 3.0], 1.0))?;
        dat.push(datum(0, &[1.0, -2.0], 2.0))?;
        dat.push(datum(0, &[0.5, 9.0], 3.0))?;

        let ys: Vec<f64> = dat.iter().map(|d| d.y).collect();
        assert_eq!(ys, vec![3.0, 2.0, 1.0]);
        Ok(())
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut dat = Dataset::new(2);
        assert!(dat.push(datum(0, &[1.0], 0.0)).is_err());
        assert!(dat.is_empty());
    }

    #[test]
    fn grid_sizes_and_order() -> anyhow::Result<()> {
        let dat = Dataset::from_grid(3, &[(-1.0, 0.5, 1.0), (0.0, 1.0, 1.5)])?;
        // 5 points along the first axis, 2 along the second
        assert_eq!(dat.len(), 10);
        assert!(dat.is_sorted());
        assert!(dat.iter().all(|d| d.p == 3 && d.y == 0.0));
        assert_eq!(dat[0].x.as_slice(), &[-1.0, 0.0]);
        assert_eq!(dat[9].x.as_slice(), &[1.0, 1.0]);

        assert!(Dataset::from_grid(0, &[(1.0, 0.0, 2.0)]).is_err());
        assert!(Dataset::from_grid(0, &[(2.0, 0.1, 1.0)]).is_err());
        Ok(())
    }

    #[test]
    fn augment_merges_sorted() -> anyhow::Result<()> {
        let mut dat = Dataset::from_grid(1, &[(0.0, 1.0, 2.0)])?;
        dat.augment_from_grid(0, &[(0.5, 1.0, 1.5)])?;
        assert_eq!(dat.len(), 5);
        assert!(dat.is_sorted());
        assert_eq!(dat[0].p, 0);
        assert_eq!(dat[2].p, 1);
        Ok(())
    }

    #[test]
    fn text_round_trip() -> anyhow::Result<()> {
        let text = "# 3 2\n1 0.5 1 -2\n0 3 4 0.25\n1 0.5 -1 7\n";
        let dat: Dataset = text.parse()?;
        assert_eq!(dat.len(), 3);
        assert_eq!(dat.dims(), 2);
        assert_eq!(dat[0].y, 0.25);
        assert_eq!(dat[1].y, 7.0);
        assert_eq!(dat.inner(), 0.0625 + 49.0 + 4.0);

        let again: Dataset = dat.to_string().parse()?;
        assert_eq!(again, dat);

        assert!("# 2 1\n0 1.0 2.0\n".parse::<Dataset>().is_err());
        assert!("0 1.0 2.0\n".parse::<Dataset>().is_err());
        assert!("# 1 1\n0 1.0\n".parse::<Dataset>().is_err());
        Ok(())
    }
}
