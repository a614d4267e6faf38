use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde_json::{Map, Value};
use thermocast_data::ObservationTable;
use thermocast_features::FeatureSchema;
use thermocast_gbm::GbmParams;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read observation records from a JSON file into a table
///
/// The file holds an array of flat objects, one per observation. Column types
/// are inferred; strings in the schema's timestamp column are parsed as
/// RFC 3339 timestamps.
pub fn read_observations_file<P>(
    path: P,
    schema: &FeatureSchema,
) -> anyhow::Result<ObservationTable>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let records: Vec<Map<String, Value>> = read_json_file("observations", path)?;
    ObservationTable::from_records(&records, &schema.timestamp)
        .with_context(|| format!("Invalid observations in {}", path.display()))
}

/// Column names of the observation files
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SchemaArg {
    /// Temperature (target) column
    #[arg(long, default_value = "temperature")]
    temperature_column: String,
    /// Hour-of-day column
    #[arg(long, default_value = "hour_of_day")]
    hour_column: String,
    /// Timestamp column, excluded from the features
    #[arg(long, default_value = "timestamp")]
    timestamp_column: String,
    /// Run one model per value of this categorical column
    #[arg(long)]
    partition_by: Option<String>,
}

impl SchemaArg {
    pub(crate) fn partition_by(&self) -> Option<&str> {
        self.partition_by.as_deref()
    }

    pub(crate) fn to_schema(&self) -> FeatureSchema {
        let defaults = FeatureSchema::default();
        FeatureSchema {
            temperature: self.temperature_column.clone(),
            hour_of_day: self.hour_column.clone(),
            timestamp: self.timestamp_column.clone(),
            partition_key: self.partition_by.clone().unwrap_or(defaults.partition_key),
        }
    }
}

/// Model hyperparameters
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ParamsArg {
    /// JSON file with model parameters; missing fields use defaults
    #[arg(long)]
    params: Option<PathBuf>,
    /// Number of boosting rounds
    #[arg(long)]
    n_estimators: Option<usize>,
    /// Shrinkage applied to each tree
    #[arg(long)]
    learning_rate: Option<f64>,
    /// Maximum tree depth
    #[arg(long)]
    max_depth: Option<usize>,
}

impl ParamsArg {
    pub(crate) fn to_params(&self) -> anyhow::Result<GbmParams> {
        let mut params = match &self.params {
            Some(path) => read_json_file("model parameters", path)?,
            None => GbmParams::default(),
        };
        if let Some(n) = self.n_estimators {
            params.n_estimators = n;
        }
        if let Some(rate) = self.learning_rate {
            params.learning_rate = rate;
        }
        if let Some(depth) = self.max_depth {
            params.max_depth = depth;
        }
        params.validate().context("Invalid model parameters")?;
        Ok(params)
    }
}

/// Split a table into the partitions to process
///
/// Without a partition column the whole table is a single, unnamed partition.
pub fn partitions(
    table: ObservationTable,
    partition_by: Option<&str>,
) -> anyhow::Result<Vec<(Option<String>, ObservationTable)>> {
    let Some(key) = partition_by else {
        return Ok(vec![(None, table)]);
    };
    let parts = table
        .partition_by(key)
        .with_context(|| format!("Failed to partition observations by '{key}'"))?;
    Ok(parts
        .into_iter()
        .map(|(value, part)| (Some(value), part))
        .collect())
}

pub fn partition_label(partition: Option<&str>) -> &str {
    partition.unwrap_or("(all)")
}
