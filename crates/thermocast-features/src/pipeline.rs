//! Schema validation, frequency-domain preparation and feature/target split.

use thermocast_data::{Column, ColumnType, ObservationTable, TableError};

use crate::{
    FREQUENCY_MAGNITUDE,
    matrix::{Feature, FeatureMatrix, MatrixError, TargetVector},
    schema::FeatureSchema,
    signal::{SignalError, SignalNormalizer},
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PrepareError {
    #[display("missing required field(s): {}", fields.join(", "))]
    Schema { fields: Vec<String> },
    #[display("field '{field}' is {found}, expected {expected}")]
    Type {
        field: String,
        expected: ColumnType,
        found: ColumnType,
    },
    #[display("invalid input: {_0}")]
    InvalidInput(InvalidInputError),
    #[display("{_0}")]
    Table(TableError),
    #[display("{_0}")]
    Matrix(MatrixError),
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvalidInputError {
    #[display("field '{field}': {source}")]
    Signal { field: String, source: SignalError },
    #[display("field '{field}' has value {value} at row {row}, expected 0 to 23")]
    HourOutOfRange {
        field: String,
        row: usize,
        value: i64,
    },
}

/// Observations with the derived frequency column, first row dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTable(ObservationTable);

impl PreparedTable {
    #[must_use]
    pub fn as_table(&self) -> &ObservationTable {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Turns one partition's observations into model inputs.
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    schema: FeatureSchema,
    normalizer: SignalNormalizer,
}

impl FeaturePipeline {
    #[must_use]
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            normalizer: SignalNormalizer::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Appends the frequency-magnitude column and drops the first row.
    ///
    /// Magnitude `k` (bin `k + 1` of the spectrum of the whole temperature
    /// sequence) is aligned with input row `k + 1`, so the output has one row
    /// fewer than the input. The input table is not modified.
    pub fn prepare(&self, table: &ObservationTable) -> Result<PreparedTable, PrepareError> {
        let temperatures = self.temperatures(table)?;

        let hour_field = &self.schema.hour_of_day;
        let hour_column = required(table, hour_field)?;
        let hours = hour_column
            .as_integer()
            .ok_or_else(|| PrepareError::Type {
                field: hour_field.clone(),
                expected: ColumnType::Integer,
                found: hour_column.column_type(),
            })?;
        if let Some((row, &value)) = hours
            .iter()
            .enumerate()
            .find(|(_, h)| !(0..=23).contains(*h))
        {
            return Err(PrepareError::InvalidInput(
                InvalidInputError::HourOutOfRange {
                    field: hour_field.clone(),
                    row,
                    value,
                },
            ));
        }

        let magnitudes = self.normalizer.transform(&temperatures).map_err(|source| {
            PrepareError::InvalidInput(InvalidInputError::Signal {
                field: self.schema.temperature.clone(),
                source,
            })
        })?;

        let prepared = table
            .skip_rows(1)
            .with_column(FREQUENCY_MAGNITUDE, Column::Numeric(magnitudes))
            .map_err(PrepareError::Table)?;
        tracing::debug!(
            input_rows = table.len(),
            prepared_rows = prepared.len(),
            "prepared observations"
        );
        Ok(PreparedTable(prepared))
    }

    /// Splits prepared rows into predictors and the temperature target.
    ///
    /// Predictors are all columns except the target and timestamp columns, in
    /// table order. Any other timestamp column is a type error.
    pub fn split(
        &self,
        prepared: &PreparedTable,
    ) -> Result<(FeatureMatrix, TargetVector), PrepareError> {
        let table = prepared.as_table();
        let target = self.temperatures(table)?;

        let mut features = Vec::new();
        for (name, column) in table.columns() {
            if name == self.schema.temperature || name == self.schema.timestamp {
                continue;
            }
            if name == self.schema.partition_key && !column.is_categorical() {
                return Err(PrepareError::Type {
                    field: name.to_owned(),
                    expected: ColumnType::Categorical,
                    found: column.column_type(),
                });
            }
            if let Some(values) = column.to_f64_vec() {
                features.push(Feature::numeric(name, values));
            } else if let Some(values) = column.as_categorical() {
                features.push(Feature::categorical(name, values));
            } else {
                return Err(PrepareError::Type {
                    field: name.to_owned(),
                    expected: ColumnType::Numeric,
                    found: column.column_type(),
                });
            }
        }

        let matrix = FeatureMatrix::new(features).map_err(PrepareError::Matrix)?;
        Ok((matrix, TargetVector::new(target)))
    }

    fn temperatures(&self, table: &ObservationTable) -> Result<Vec<f64>, PrepareError> {
        let missing = self
            .schema
            .required_fields()
            .filter(|field| !table.contains_column(field))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(PrepareError::Schema { fields: missing });
        }

        let field = &self.schema.temperature;
        let column = required(table, field)?;
        column.to_f64_vec().ok_or_else(|| PrepareError::Type {
            field: field.clone(),
            expected: ColumnType::Numeric,
            found: column.column_type(),
        })
    }
}

fn required<'a>(table: &'a ObservationTable, field: &str) -> Result<&'a Column, PrepareError> {
    table.column(field).ok_or_else(|| PrepareError::Schema {
        fields: vec![field.to_owned()],
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::matrix::FeatureKind;

    fn table(locations: &[&str], hours: Vec<i64>, temperatures: Vec<f64>) -> ObservationTable {
        let timestamps = (0..hours.len())
            .map(|h| DateTime::<Utc>::UNIX_EPOCH + Duration::hours(i64::try_from(h).unwrap()))
            .collect();
        ObservationTable::new()
            .with_column("timestamp", Column::Timestamp(timestamps))
            .unwrap()
            .with_column(
                "location",
                Column::Categorical(locations.iter().map(|&s| s.to_owned()).collect()),
            )
            .unwrap()
            .with_column("hour_of_day", Column::Integer(hours))
            .unwrap()
            .with_column("temperature", Column::Numeric(temperatures))
            .unwrap()
    }

    #[test]
    fn test_prepare_drops_first_row_and_appends_magnitude() {
        let input = table(&["a"; 4], vec![0, 1, 2, 3], vec![1.0, 2.0, 3.0, 4.0]);
        let snapshot = input.clone();
        let prepared = FeaturePipeline::default().prepare(&input).unwrap();

        assert_eq!(input, snapshot);
        assert_eq!(prepared.len(), 3);
        assert_eq!(
            prepared.as_table().column("hour_of_day"),
            Some(&Column::Integer(vec![1, 2, 3]))
        );
        let Some(Column::Numeric(magnitudes)) = prepared.as_table().column(FREQUENCY_MAGNITUDE)
        else {
            panic!("missing magnitude column");
        };
        assert!((magnitudes[1] - 2.0).abs() < 1e-9);
        assert_eq!(
            prepared.as_table().column_names().last(),
            Some(FREQUENCY_MAGNITUDE)
        );
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let input = ObservationTable::new()
            .with_column("location", Column::Categorical(vec!["a".into(); 3]))
            .unwrap();
        let err = FeaturePipeline::default().prepare(&input).unwrap_err();
        assert!(matches!(&err, PrepareError::Schema { fields } if fields.len() == 2));
        let message = err.to_string();
        assert!(message.contains("temperature"), "{message}");
        assert!(message.contains("hour_of_day"), "{message}");
    }

    #[test]
    fn test_wrong_column_types() {
        let bad = ObservationTable::new()
            .with_column("hour_of_day", Column::Numeric(vec![0.0, 1.0]))
            .unwrap()
            .with_column("temperature", Column::Numeric(vec![1.0, 2.0]))
            .unwrap();
        let err = FeaturePipeline::default().prepare(&bad).unwrap_err();
        assert!(matches!(
            err,
            PrepareError::Type {
                expected: ColumnType::Integer,
                found: ColumnType::Numeric,
                ..
            }
        ));

        let bad = ObservationTable::new()
            .with_column("hour_of_day", Column::Integer(vec![0, 1]))
            .unwrap()
            .with_column("temperature", Column::Categorical(vec!["x".into(); 2]))
            .unwrap();
        let err = FeaturePipeline::default().prepare(&bad).unwrap_err();
        assert!(matches!(err, PrepareError::Type { ref field, .. } if field == "temperature"));
    }

    #[test]
    fn test_invalid_input() {
        let pipeline = FeaturePipeline::default();
        let err = pipeline
            .prepare(&table(&["a"], vec![0], vec![1.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            PrepareError::InvalidInput(InvalidInputError::Signal {
                source: SignalError::TooShort { len: 1 },
                ..
            })
        ));

        let err = pipeline
            .prepare(&table(&["a"; 3], vec![0, 24, 2], vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            PrepareError::InvalidInput(InvalidInputError::HourOutOfRange {
                row: 1,
                value: 24,
                ..
            })
        ));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_split_encodes_partition_key_as_categorical() {
        let input = table(
            &["x", "y", "z", "x", "y", "z", "x"],
            (0..7).collect(),
            vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0],
        );
        let pipeline = FeaturePipeline::default();
        let prepared = pipeline.prepare(&input).unwrap();
        let (matrix, target) = pipeline.split(&prepared).unwrap();

        assert_eq!(
            matrix.names().collect::<Vec<_>>(),
            ["location", "hour_of_day", FREQUENCY_MAGNITUDE]
        );
        assert_eq!(matrix.kind_of("location"), Some(FeatureKind::Categorical));
        assert_eq!(matrix.features()[0].column.levels(), ["y", "z", "x"]);
        assert_eq!(target.as_slice().to_vec(), vec![1.0, 4.0, 1.0, 5.0, 9.0, 2.0]);
        assert_eq!(matrix.n_rows(), target.len());
    }

    #[test]
    fn test_split_rejects_numeric_partition_key() {
        let input = ObservationTable::new()
            .with_column("location", Column::Integer(vec![1, 2, 3]))
            .unwrap()
            .with_column("hour_of_day", Column::Integer(vec![0, 1, 2]))
            .unwrap()
            .with_column("temperature", Column::Numeric(vec![1.0, 2.0, 3.0]))
            .unwrap();
        let pipeline = FeaturePipeline::default();
        let prepared = pipeline.prepare(&input).unwrap();
        assert!(matches!(
            pipeline.split(&prepared),
            Err(PrepareError::Type {
                expected: ColumnType::Categorical,
                ..
            })
        ));
    }

    #[test]
    fn test_split_rejects_extra_timestamp_column() {
        let input = table(&["a"; 3], vec![0, 1, 2], vec![1.0, 2.0, 3.0])
            .with_column(
                "observed_at",
                Column::Timestamp(vec![DateTime::<Utc>::UNIX_EPOCH; 3]),
            )
            .unwrap();
        let pipeline = FeaturePipeline::default();
        let prepared = pipeline.prepare(&input).unwrap();
        let err = pipeline.split(&prepared).unwrap_err();
        assert!(matches!(
            &err,
            PrepareError::Type {
                field,
                found: ColumnType::Timestamp,
                ..
            } if field == "observed_at"
        ));
    }
}
