use clap::ValueEnum;
use log::info;
use vfl::data::Dataset;
use vfl::model::Model;
use vfl::optim::{FullGradient, MeanField, OptimOptions, Optimizer};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum OptimizerKind {
    /// natural-gradient line search
    Fg,
    /// mean-field coordinate ascent
    Mf,
}

/// Optimizer options from an optional JSON file, then command-line
/// overrides
pub fn read_options(
    config: Option<&str>,
    max_iters: Option<usize>,
    l0: Option<f64>,
) -> anyhow::Result<OptimOptions> {
    let mut opts = match config {
        Some(file) => {
            let text = std::fs::read_to_string(file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {}", file, e))?;
            OptimOptions::from_json(&text)?
        }
        None => OptimOptions::default(),
    };

    if let Some(max_iters) = max_iters {
        opts.set_max_iters(max_iters)?;
    }
    if let Some(l0) = l0 {
        opts.set_lipschitz_init(l0)?;
    }
    Ok(opts)
}

pub fn fit<M: Model>(model: &mut M, kind: OptimizerKind, opts: OptimOptions) -> anyhow::Result<f64> {
    info!(
        "fitting {} model with {} factors on {} observations",
        model.name(),
        model.nfactors(),
        model.data().len()
    );

    let bound = match kind {
        OptimizerKind::Fg => FullGradient::new(model, opts)?.execute()?,
        OptimizerKind::Mf => MeanField::new(model, opts)?.execute()?,
    };

    info!("final bound: {:.6}", bound);
    Ok(bound)
}

/// Write predictive means and variances over `grid` to
/// `{out}.mean.txt` and `{out}.var.txt`
pub fn write_predictions<M: Model>(model: &M, grid: &Dataset, out: &str) -> anyhow::Result<()> {
    let (mean, var) = model.predict_all(grid)?;

    let mean_file = format!("{}.mean.txt", out);
    let var_file = format!("{}.var.txt", out);
    std::fs::write(&mean_file, mean.to_string())?;
    std::fs::write(&var_file, var.to_string())?;

    info!("wrote {} predictions to {} and {}", grid.len(), mean_file, var_file);
    Ok(())
}
