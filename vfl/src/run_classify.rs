use crate::run_common::*;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use vfl::data::{Dataset, Datum};
use vfl::factor::{Factor, Impulse, Product};
use vfl::model::{Model, Vfc};

#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// number of simulated observations per class
    #[arg(short, long, default_value_t = 125)]
    n_per_class: usize,

    /// within-class standard deviation
    #[arg(long, default_value_t = 0.25)]
    spread: f64,

    /// number of two-dimensional product factors
    #[arg(short = 'm', long, default_value_t = 10)]
    n_factors: usize,

    /// prior precision of each impulse in a product factor
    #[arg(long, default_value_t = 10.0)]
    factor_tau: f64,

    /// prior precision of the weights
    #[arg(long, default_value_t = 1e-6)]
    nu: f64,

    /// optimizer
    #[arg(long, value_enum, default_value = "fg")]
    optimizer: OptimizerKind,

    /// optimizer options in JSON
    #[arg(long)]
    config: Option<Box<str>>,

    /// maximum number of optimizer passes (overrides the configuration)
    #[arg(long)]
    max_iters: Option<usize>,

    /// initial Lipschitz constant (overrides the configuration)
    #[arg(long)]
    l0: Option<f64>,

    /// prediction grid spacing over [-1.5, 1] x [-0.3, 1.2]
    #[arg(long, default_value_t = 0.05)]
    grid_step: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    #[arg(
        short,
        long = "verbose",
        help = "Verbosity.",
        long_help = "Increase output verbosity."
    )]
    verbose: bool,
}

/// Two Gaussian clouds in the plane, labelled 0 and 1
fn simulate_classes<R: Rng>(n: usize, spread: f64, rng: &mut R) -> anyhow::Result<Dataset> {
    let centers = [(-0.5, 0.3), (0.2, 0.7)];
    let noise = Normal::new(0.0, spread)?;

    let mut data = Dataset::new(2);
    for (label, &(cx, cy)) in centers.iter().enumerate() {
        for _ in 0..n {
            let x = nalgebra::DVector::from_vec(vec![cx + noise.sample(rng), cy + noise.sample(rng)]);
            data.push(Datum::new(0, x, label as f64))?;
        }
    }
    Ok(data)
}

pub fn run_classify(args: &ClassifyArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let data = simulate_classes(args.n_per_class, args.spread, &mut rng)?;
    info!("simulated {} labelled observations", data.len());

    let mut model = Vfc::new(data, args.nu)?;
    for _ in 0..args.n_factors {
        let fx: Box<dyn Factor> = Box::new(Impulse::new(0.0, args.factor_tau)?);
        let fy: Box<dyn Factor> = Box::new(Impulse::new(0.0, args.factor_tau)?);
        model.add_factor(Box::new(Product::new(vec![(0, fx), (1, fy)])?))?;
    }

    // scatter the posterior locations over the data
    let scatter = Normal::new(0.0, 0.5)?;
    for j in 0..args.n_factors {
        let mut x = model.factors()[j].par().clone();
        x[0] = -0.25 + scatter.sample(&mut rng);
        x[2] = 0.45 + scatter.sample(&mut rng);
        model.set_parms(j, &x)?;
    }

    let opts = read_options(args.config.as_deref(), args.max_iters, args.l0)?;
    fit(&mut model, args.optimizer, opts)?;

    let step = args.grid_step;
    let grid = Dataset::from_grid(0, &[(-1.5, step, 1.0), (-0.3, step, 1.2)])?;
    write_predictions(&model, &grid, &args.out)?;

    info!("Done");
    Ok(())
}
