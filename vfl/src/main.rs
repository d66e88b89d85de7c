mod run_classify;
mod run_common;
mod run_regress;

use clap::{Parser, Subcommand};
use run_classify::*;
use run_regress::*;

/// Variational feature learning on simulated data
#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit impulse factors to noisy `sinc` observations and predict over
    /// a grid
    Regress(RegressArgs),
    /// Fit products of impulses to two simulated classes in the plane
    /// and predict class probabilities over a grid
    Classify(ClassifyArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Regress(args) => {
            run_regress(args)?;
        }
        Commands::Classify(args) => {
            run_classify(args)?;
        }
    }

    Ok(())
}
