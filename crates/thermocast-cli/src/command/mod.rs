use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{explain::ExplainArg, generate::GenerateArg, predict::PredictArg, prepare::PrepareArg};

mod explain;
mod generate;
mod predict;
mod prepare;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v: info, -vv: debug); `RUST_LOG` takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Generate synthetic hourly observations
    Generate(#[clap(flatten)] GenerateArg),
    /// Add the frequency-magnitude feature to observations
    Prepare(#[clap(flatten)] PrepareArg),
    /// Train a model per partition and predict the observations
    Predict(#[clap(flatten)] PredictArg),
    /// Train a model per partition and rank its features by SHAP importance
    Explain(#[clap(flatten)] ExplainArg),
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.verbose);
    match args.mode {
        Mode::Generate(arg) => generate::run(&arg)?,
        Mode::Prepare(arg) => prepare::run(&arg)?,
        Mode::Predict(arg) => predict::run(&arg)?,
        Mode::Explain(arg) => explain::run(&arg)?,
    }
    Ok(())
}
