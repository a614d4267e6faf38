use std::path::PathBuf;

use anyhow::Context;
use thermocast_data::synthetic::{self, SyntheticConfig};

use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateArg {
    /// Locations to generate, one hourly series each
    #[arg(long, value_delimiter = ',', default_value = "london,paris,berlin")]
    locations: Vec<String>,
    /// Number of hourly observations per location
    #[arg(long, default_value_t = 24 * 7)]
    hours: usize,
    /// Mean temperature of the first location
    #[arg(long, default_value_t = 15.0)]
    base_temperature: f64,
    /// Amplitude of the diurnal cycle
    #[arg(long, default_value_t = 10.0)]
    amplitude: f64,
    /// Standard deviation of the Gaussian temperature noise
    #[arg(long, default_value_t = 0.5)]
    noise_std_dev: f64,
    /// Add an auxiliary column of uniform noise with this name
    #[arg(long)]
    noise_feature: Option<String>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateArg) -> anyhow::Result<()> {
    let config = SyntheticConfig {
        locations: arg.locations.clone(),
        hours: arg.hours,
        base_temperature: arg.base_temperature,
        amplitude: arg.amplitude,
        noise_std_dev: arg.noise_std_dev,
        noise_feature: arg.noise_feature.clone(),
        seed: arg.seed,
        ..SyntheticConfig::default()
    };
    let observations =
        synthetic::generate(&config).context("Failed to generate synthetic observations")?;
    Output::save_json(&observations, arg.output.clone())?;

    eprintln!(
        "Generated {} observations for {} location(s)",
        observations.len(),
        config.locations.len()
    );
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    Ok(())
}
