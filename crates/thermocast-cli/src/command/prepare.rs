use std::path::PathBuf;

use anyhow::Context;
use thermocast_predictor::WeatherPredictor;

use crate::util::{self, Output, SchemaArg};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PrepareArg {
    /// Observations JSON file
    input: PathBuf,
    #[clap(flatten)]
    schema: SchemaArg,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PrepareArg) -> anyhow::Result<()> {
    let schema = arg.schema.to_schema();
    let table = util::read_observations_file(&arg.input, &schema)?;
    let predictor = WeatherPredictor::new().with_schema(schema);

    let mut records = vec![];
    for (partition, part) in util::partitions(table, arg.schema.partition_by())? {
        let label = util::partition_label(partition.as_deref());
        let prepared = predictor
            .prepare_data(&part)
            .with_context(|| format!("Failed to prepare partition {label}"))?;
        eprintln!(
            "Prepared partition {label}: {} -> {} rows",
            part.len(),
            prepared.len()
        );
        records.extend(prepared.as_table().to_records());
    }
    Output::save_json(&records, arg.output.clone())?;
    Ok(())
}
