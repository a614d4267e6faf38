use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use thermocast_attribution::AttributionReport;
use thermocast_predictor::WeatherPredictor;

use crate::util::{self, Output, ParamsArg, SchemaArg};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ExplainArg {
    /// Observations JSON file
    input: PathBuf,
    #[clap(flatten)]
    schema: SchemaArg,
    #[clap(flatten)]
    params: ParamsArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PartitionReport {
    partition: Option<String>,
    report: AttributionReport,
}

pub(crate) fn run(arg: &ExplainArg) -> anyhow::Result<()> {
    let schema = arg.schema.to_schema();
    let params = arg.params.to_params()?;
    let table = util::read_observations_file(&arg.input, &schema)?;

    let mut reports = vec![];
    for (partition, part) in util::partitions(table, arg.schema.partition_by())? {
        let label = util::partition_label(partition.as_deref());
        let mut predictor = WeatherPredictor::new()
            .with_schema(schema.clone())
            .with_params(params.clone());
        predictor
            .predict(&part)
            .with_context(|| format!("Failed to train partition {label}"))?;
        let report = predictor
            .calculate_global_shap()
            .with_context(|| format!("Failed to explain partition {label}"))?;

        eprintln!("Partition {label} (base value {:.4}):", report.base_value);
        for (rank, feature) in report.iter().enumerate() {
            eprintln!(
                "  {:2}. {:<24} {:.4}",
                rank + 1,
                feature.feature,
                feature.importance
            );
        }
        reports.push(PartitionReport { partition, report });
    }
    Output::save_json(&reports, arg.output.clone())?;
    Ok(())
}
