use std::path::PathBuf;

use anyhow::Context;
use thermocast_predictor::WeatherPredictor;

use crate::{
    model::artifact::{ModelArtifact, ResidualSummary, TrainingMetrics},
    util::{self, Output, ParamsArg, SchemaArg},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PredictArg {
    /// Observations JSON file
    input: PathBuf,
    #[clap(flatten)]
    schema: SchemaArg,
    #[clap(flatten)]
    params: ParamsArg,
    /// Name recorded in saved models
    #[arg(long, default_value = "thermocast")]
    name: String,
    /// Save the trained models (one per partition) to this file
    #[arg(long)]
    model_output: Option<PathBuf>,
    /// Output file path for the predictions
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PredictArg) -> anyhow::Result<()> {
    let schema = arg.schema.to_schema();
    let params = arg.params.to_params()?;
    let table = util::read_observations_file(&arg.input, &schema)?;

    let mut predictions = vec![];
    let mut artifacts = vec![];
    for (partition, part) in util::partitions(table, arg.schema.partition_by())? {
        let label = util::partition_label(partition.as_deref());
        tracing::info!(partition = label, rows = part.len(), "training partition");
        let mut predictor = WeatherPredictor::new()
            .with_schema(schema.clone())
            .with_params(params.clone());
        let rows = predictor
            .predict(&part)
            .with_context(|| format!("Failed to train partition {label}"))?;
        let trained = predictor
            .trained()
            .context("Predictor has no trained model after predict")?;

        let metrics = TrainingMetrics::from_trained(trained);
        eprintln!("Partition {label}:");
        eprintln!("  Rows: {}", metrics.rows);
        eprintln!("  MAE:  {:.4}", metrics.mae);
        eprintln!("  RMSE: {:.4}", metrics.rmse);
        eprintln!("  R2:   {:.4}", metrics.r2);
        if let Some(residuals) = ResidualSummary::from_trained(trained) {
            eprintln!(
                "  Residuals: min {:.4}, median {:.4}, max {:.4}",
                residuals.min, residuals.median, residuals.max
            );
        }

        if arg.model_output.is_some() {
            artifacts.push(ModelArtifact::from_trained(&arg.name, partition.as_deref(), trained));
        }
        predictions.extend(rows);
    }
    Output::save_json(&predictions, arg.output.clone())?;

    if let Some(path) = &arg.model_output {
        Output::save_json(&artifacts, Some(path.clone()))?;
        eprintln!();
        eprintln!("Models saved successfully");
        eprintln!("  Path: {}", path.display());
        eprintln!("  Models: {}", artifacts.len());
    }
    Ok(())
}
