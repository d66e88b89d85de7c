use crate::run_common::*;

use clap::{Parser, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use vfl::data::{Dataset, Datum};
use vfl::factor::Impulse;
use vfl::model::{Model, TauVfr, Vfr};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum NoiseModel {
    /// gamma-distributed noise precision
    Vfr,
    /// known noise precision
    Tauvfr,
}

#[derive(Parser, Debug, Clone)]
pub struct RegressArgs {
    /// number of simulated observations
    #[arg(short, long, default_value_t = 200)]
    n_obs: usize,

    /// noise standard deviation of the simulated observations
    #[arg(long, default_value_t = 0.1)]
    noise_sd: f64,

    /// number of impulse factors
    #[arg(short = 'm', long, default_value_t = 10)]
    n_factors: usize,

    /// prior precision of the impulse factors
    #[arg(long, default_value_t = 0.5)]
    factor_tau: f64,

    /// noise model
    #[arg(long, value_enum, default_value = "vfr")]
    noise: NoiseModel,

    /// noise precision prior shape (vfr)
    #[arg(long, default_value_t = 1000.0)]
    alpha0: f64,

    /// noise precision prior rate (vfr)
    #[arg(long, default_value_t = 2.5)]
    beta0: f64,

    /// known noise precision (tauvfr)
    #[arg(long, default_value_t = 100.0)]
    tau: f64,

    /// relative prior precision of the weights
    #[arg(long, default_value_t = 1e-3)]
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

    /// prediction grid spacing over [-10, 10]
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

/// `sin(x)/x` with additive Gaussian noise at uniform locations on
/// `[-10, 10]`
fn simulate_sinc<R: Rng>(n: usize, sd: f64, rng: &mut R) -> anyhow::Result<Dataset> {
    let mut data = Dataset::new(1);
    for _ in 0..n {
        let x = -10.0 + 20.0 * rng.random::<f64>();
        let sinc = if x == 0.0 { 1.0 } else { x.sin() / x };
        let noise: f64 = rng.sample(StandardNormal);
        data.push(Datum::new(0, nalgebra::DVector::from_vec(vec![x]), sinc + sd * noise))?;
    }
    Ok(data)
}

/// Impulses with prior location zero; posterior locations start at
/// random positions
fn add_impulses<M: Model, R: Rng>(model: &mut M, args: &RegressArgs, rng: &mut R) -> anyhow::Result<()> {
    for _ in 0..args.n_factors {
        model.add_factor(Box::new(Impulse::new(0.0, args.factor_tau)?))?;
    }
    for j in 0..args.n_factors {
        let z: f64 = rng.sample(StandardNormal);
        let x = nalgebra::DVector::from_vec(vec![2.5 * z, args.factor_tau]);
        model.set_parms(j, &x)?;
    }
    Ok(())
}

fn fit_and_predict<M: Model>(model: &mut M, args: &RegressArgs) -> anyhow::Result<()> {
    let opts = read_options(args.config.as_deref(), args.max_iters, args.l0)?;
    fit(model, args.optimizer, opts)?;

    let grid = Dataset::from_grid(0, &[(-10.0, args.grid_step, 10.0)])?;
    write_predictions(model, &grid, &args.out)
}

pub fn run_regress(args: &RegressArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let data = simulate_sinc(args.n_obs, args.noise_sd, &mut rng)?;
    info!("simulated {} sinc observations", data.len());

    match args.noise {
        NoiseModel::Vfr => {
            let mut model = Vfr::new(data, args.alpha0, args.beta0, args.nu)?;
            add_impulses(&mut model, args, &mut rng)?;
            fit_and_predict(&mut model, args)?;
            info!("posterior noise precision: {:.4}", model.tau());
        }
        NoiseModel::Tauvfr => {
            let mut model = TauVfr::new(data, args.tau, args.nu)?;
            add_impulses(&mut model, args, &mut rng)?;
            fit_and_predict(&mut model, args)?;
        }
    }

    info!("Done");
    Ok(())
}
