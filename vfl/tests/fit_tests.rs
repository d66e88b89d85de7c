use approx::assert_abs_diff_eq;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use vfl::data::{Dataset, Datum};
use vfl::factor::{Factor, Impulse, Product};
use vfl::model::{Model, Vfc, Vfr};
use vfl::optim::{FullGradient, OptimOptions, Optimizer};

fn sinc_data(n: usize, rng: &mut StdRng) -> anyhow::Result<Dataset> {
    let mut data = Dataset::new(1);
    for _ in 0..n {
        let x = -10.0 + 20.0 * rng.random::<f64>();
        let noise: f64 = rng.sample(StandardNormal);
        data.push(Datum::new(0, DVector::from_vec(vec![x]), x.sin() / x + 0.05 * noise))?;
    }
    Ok(data)
}

#[test]
fn sinc_regression_end_to_end() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(1);
    let data = sinc_data(120, &mut rng)?;
    assert!(data.is_sorted());

    let mut model = Vfr::new(data, 1000.0, 2.5, 1e-3)?;
    for _ in 0..8 {
        model.add_factor(Box::new(Impulse::new(0.0, 0.5)?))?;
    }
    for j in 0..8 {
        let z: f64 = rng.sample(StandardNormal);
        model.set_parms(j, &DVector::from_vec(vec![2.5 * z, 0.5]))?;
    }

    model.infer()?;
    let initial = model.bound();

    let mut opts = OptimOptions::default();
    opts.set_max_iters(30)?;
    let bound = FullGradient::new(&mut model, opts)?.execute()?;
    assert!(bound > initial);

    let grid = Dataset::from_grid(0, &[(-10.0, 0.5, 10.0)])?;
    assert_eq!(grid.len(), 41);

    let (mean, var) = model.predict_all(&grid)?;
    assert_eq!(mean.len(), grid.len());
    assert_eq!(var.len(), grid.len());
    for ((g, m), v) in grid.iter().zip(mean.iter()).zip(var.iter()) {
        assert_eq!(g.x, m.x);
        assert_eq!(g.x, v.x);
        assert!(m.y.is_finite());
        assert!(v.y > 0.0);
    }

    // predictions survive the text format
    let text = mean.to_string();
    let parsed: Dataset = text.parse()?;
    assert_eq!(parsed.len(), mean.len());
    for (a, b) in parsed.iter().zip(mean.iter()) {
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-12 * (1.0 + b.y.abs()));
    }
    Ok(())
}

#[test]
fn product_factors_classify_two_clouds() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(5);
    let mut data = Dataset::new(2);
    for (label, (cx, cy)) in [(-0.6, 0.0), (0.6, 0.0)].into_iter().enumerate() {
        for _ in 0..40 {
            let dx: f64 = rng.sample(StandardNormal);
            let dy: f64 = rng.sample(StandardNormal);
            let x = DVector::from_vec(vec![cx + 0.3 * dx, cy + 0.3 * dy]);
            data.push(Datum::new(0, x, label as f64))?;
        }
    }

    let mut model = Vfc::new(data, 1e-2)?;
    for &(mx, my) in &[(-0.6, 0.0), (0.6, 0.0)] {
        let fx: Box<dyn Factor> = Box::new(Impulse::new(mx, 2.0)?);
        let fy: Box<dyn Factor> = Box::new(Impulse::new(my, 2.0)?);
        model.add_factor(Box::new(Product::new(vec![(0, fx), (1, fy)])?))?;
    }
    assert_eq!(model.factors()[0].npar(), 4);
    assert_eq!(model.weight_idx(1), 1);

    model.infer()?;
    let initial = model.bound();

    let mut opts = OptimOptions::default();
    opts.set_max_iters(10)?;
    let mut opt = FullGradient::new(&mut model, opts)?;
    let bound = opt.execute()?;
    assert!(bound >= initial);

    let (left, _) = model.predict(&DVector::from_vec(vec![-0.6, 0.0]));
    let (right, var) = model.predict(&DVector::from_vec(vec![0.6, 0.0]));
    assert!(left < 0.5);
    assert!(right > 0.5);
    assert_abs_diff_eq!(var, right * (1.0 - right));
    Ok(())
}
