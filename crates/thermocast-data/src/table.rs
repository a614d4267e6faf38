use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{Column, ColumnType, Observation, TableError, columns};

/// Column-oriented table of time-ordered observations.
///
/// Columns keep their insertion order and all share the same row count. Every
/// operation returns a new table and leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl ObservationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns an error if a column with the same name exists or if the row count
    /// differs from the existing columns.
    pub fn push_column<S>(&mut self, name: S, column: Column) -> Result<(), TableError>
    where
        S: Into<String>,
    {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(TableError::DuplicateColumn { name });
        }
        if let Some(first) = self.columns.first()
            && first.len() != column.len()
        {
            return Err(TableError::LengthMismatch {
                name,
                expected: first.len(),
                actual: column.len(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style variant of [`push_column`](Self::push_column).
    pub fn with_column<S>(mut self, name: S, column: Column) -> Result<Self, TableError>
    where
        S: Into<String>,
    {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    #[must_use]
    pub fn contains_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Returns a copy without the first `count` rows.
    #[must_use]
    pub fn skip_rows(&self, count: usize) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.skip_rows(count)).collect(),
        }
    }

    /// Returns a copy containing the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| c.select_rows(indices))
                .collect(),
        }
    }

    /// Splits the table by the values of a categorical column.
    ///
    /// Each partition keeps the original relative row order. Partitions are
    /// returned in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is absent or not categorical.
    pub fn partition_by(&self, key: &str) -> Result<BTreeMap<String, Self>, TableError> {
        let column = self.column(key).ok_or_else(|| TableError::MissingColumn {
            column: key.to_owned(),
        })?;
        let keys = column
            .as_categorical()
            .ok_or_else(|| TableError::UnexpectedType {
                column: key.to_owned(),
                expected: ColumnType::Categorical,
                found: column.column_type(),
            })?;

        let mut indices = BTreeMap::<&str, Vec<usize>>::new();
        for (row, value) in keys.iter().enumerate() {
            indices.entry(value.as_str()).or_default().push(row);
        }
        Ok(indices
            .into_iter()
            .map(|(value, rows)| (value.to_owned(), self.select_rows(&rows)))
            .collect())
    }

    /// Builds a table from typed observations.
    ///
    /// Columns are `timestamp`, `location`, `hour_of_day`, `temperature`, followed
    /// by the auxiliary features of the first observation in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if observations disagree on their auxiliary feature names.
    pub fn from_observations(observations: &[Observation]) -> Result<Self, TableError> {
        let mut table = Self::new()
            .with_column(
                columns::TIMESTAMP,
                Column::Timestamp(observations.iter().map(|o| o.timestamp).collect()),
            )?
            .with_column(
                columns::LOCATION,
                Column::Categorical(observations.iter().map(|o| o.location.clone()).collect()),
            )?
            .with_column(
                columns::HOUR_OF_DAY,
                Column::Integer(
                    observations
                        .iter()
                        .map(|o| i64::from(o.hour_of_day))
                        .collect(),
                ),
            )?
            .with_column(
                columns::TEMPERATURE,
                Column::Numeric(observations.iter().map(|o| o.temperature).collect()),
            )?;

        let Some(first) = observations.first() else {
            return Ok(table);
        };
        for name in first.auxiliary.keys() {
            let values = observations
                .iter()
                .enumerate()
                .map(|(row, o)| {
                    o.auxiliary
                        .get(name)
                        .copied()
                        .ok_or_else(|| TableError::MissingValue {
                            column: name.clone(),
                            row,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            table.push_column(name.clone(), Column::Numeric(values))?;
        }
        // names only present in later rows are missing from the first one
        if let Some(name) = observations
            .iter()
            .flat_map(|o| o.auxiliary.keys())
            .find(|k| !first.auxiliary.contains_key(*k))
        {
            return Err(TableError::MissingValue {
                column: name.clone(),
                row: 0,
            });
        }
        Ok(table)
    }

    /// Builds a table from JSON records, inferring each column's type.
    ///
    /// Columns appear in first-seen key order. Inference rules:
    ///
    /// - all integers → [`Column::Integer`]
    /// - all numbers → [`Column::Numeric`]
    /// - all strings in `timestamp_column` parsing as RFC 3339 → [`Column::Timestamp`]
    /// - other strings → [`Column::Categorical`]
    ///
    /// # Errors
    ///
    /// Returns an error on missing or `null` cells, on columns mixing strings and
    /// numbers, and on booleans, arrays or objects.
    pub fn from_records(
        records: &[Map<String, Value>],
        timestamp_column: &str,
    ) -> Result<Self, TableError> {
        let mut names = Vec::<&str>::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key.as_str()) {
                    names.push(key);
                }
            }
        }

        let mut table = Self::new();
        for name in names {
            let cells = records
                .iter()
                .enumerate()
                .map(|(row, record)| match record.get(name) {
                    None | Some(Value::Null) => Err(TableError::MissingValue {
                        column: name.to_owned(),
                        row,
                    }),
                    Some(value) => Ok(value),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let column = infer_column(name, &cells, name == timestamp_column)?;
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    /// Converts the table back to JSON records in row order.
    #[must_use]
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.len())
            .map(|row| {
                self.columns()
                    .filter_map(|(name, column)| Some((name.to_owned(), column.json_value(row)?)))
                    .collect()
            })
            .collect()
    }
}

fn cell_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Number(n) if n.is_i64() => Some(ColumnType::Integer),
        Value::Number(_) => Some(ColumnType::Numeric),
        Value::String(_) => Some(ColumnType::Categorical),
        _ => None,
    }
}

fn infer_column(name: &str, cells: &[&Value], is_timestamp: bool) -> Result<Column, TableError> {
    let mut inferred: Option<ColumnType> = None;
    for (row, cell) in cells.iter().enumerate() {
        let ty = cell_type(cell).ok_or_else(|| TableError::UnsupportedValue {
            column: name.to_owned(),
            row,
            value: (*cell).clone(),
        })?;
        inferred = match (inferred, ty) {
            (None, ty) => Some(ty),
            (Some(a), b) if a == b => Some(a),
            (Some(ColumnType::Integer), ColumnType::Numeric)
            | (Some(ColumnType::Numeric), ColumnType::Integer) => Some(ColumnType::Numeric),
            (Some(first), second) => {
                return Err(TableError::MixedTypes {
                    column: name.to_owned(),
                    first,
                    second,
                    row,
                });
            }
        };
    }

    let column = match inferred {
        Some(ColumnType::Integer) => {
            Column::Integer(cells.iter().filter_map(|c| c.as_i64()).collect())
        }
        Some(ColumnType::Numeric) => {
            Column::Numeric(cells.iter().filter_map(|c| c.as_f64()).collect())
        }
        Some(ColumnType::Categorical | ColumnType::Timestamp) | None => {
            let strings = cells.iter().filter_map(|c| c.as_str()).collect::<Vec<_>>();
            match parse_timestamps(&strings).filter(|_| is_timestamp) {
                Some(timestamps) => Column::Timestamp(timestamps),
                None => Column::Categorical(strings.into_iter().map(str::to_owned).collect()),
            }
        }
    };
    Ok(column)
}

fn parse_timestamps(values: &[&str]) -> Option<Vec<DateTime<Utc>>> {
    values
        .iter()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use serde_json::json;

    use super::*;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_infers_column_types() {
        let table = ObservationTable::from_records(
            &records(json!([
                {"timestamp": "2024-01-01T00:00:00Z", "location": "a", "hour_of_day": 0, "temperature": 1.5},
                {"timestamp": "2024-01-01T01:00:00Z", "location": "b", "hour_of_day": 1, "temperature": 2},
            ])),
            columns::TIMESTAMP,
        )
        .unwrap();

        let names = table.column_names().collect::<Vec<_>>();
        assert_eq!(names, ["timestamp", "location", "hour_of_day", "temperature"]);
        assert!(table.column("timestamp").unwrap().is_timestamp());
        assert!(table.column("location").unwrap().is_categorical());
        assert!(table.column("hour_of_day").unwrap().is_integer());
        assert_eq!(
            table.column("temperature").unwrap(),
            &Column::Numeric(vec![1.5, 2.0])
        );
    }

    #[test]
    fn test_strings_outside_timestamp_column_stay_categorical() {
        let table = ObservationTable::from_records(
            &records(json!([{"when": "2024-01-01T00:00:00Z"}])),
            columns::TIMESTAMP,
        )
        .unwrap();
        assert!(table.column("when").unwrap().is_categorical());
    }

    #[test]
    fn test_missing_and_mixed_cells_are_rejected() {
        let err = ObservationTable::from_records(
            &records(json!([{"a": 1}, {"b": 2}])),
            columns::TIMESTAMP,
        )
        .unwrap_err();
        assert!(matches!(err, TableError::MissingValue { ref column, row: 1 } if column == "a"));

        let err = ObservationTable::from_records(
            &records(json!([{"a": 1}, {"a": "x"}])),
            columns::TIMESTAMP,
        )
        .unwrap_err();
        assert!(matches!(err, TableError::MixedTypes { row: 1, .. }));

        let err = ObservationTable::from_records(
            &records(json!([{"a": true}])),
            columns::TIMESTAMP,
        )
        .unwrap_err();
        assert!(matches!(err, TableError::UnsupportedValue { row: 0, .. }));
    }

    #[test]
    fn test_push_column_checks_shape() {
        let mut table = ObservationTable::new()
            .with_column("a", Column::Numeric(vec![1.0, 2.0]))
            .unwrap();
        assert!(matches!(
            table.push_column("a", Column::Numeric(vec![1.0, 2.0])),
            Err(TableError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            table.push_column("b", Column::Numeric(vec![1.0])),
            Err(TableError::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_partition_preserves_row_order() {
        let table = ObservationTable::new()
            .with_column(
                "location",
                Column::Categorical(["b", "a", "b", "a", "b"].map(String::from).to_vec()),
            )
            .unwrap()
            .with_column("t", Column::Integer(vec![0, 1, 2, 3, 4]))
            .unwrap();

        let parts = table.partition_by("location").unwrap();
        assert_eq!(parts.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(parts["a"].column("t"), Some(&Column::Integer(vec![1, 3])));
        assert_eq!(parts["b"].column("t"), Some(&Column::Integer(vec![0, 2, 4])));

        assert!(matches!(
            table.partition_by("t"),
            Err(TableError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_records_round_trip_through_observations() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let observations = (0..3)
            .map(|h| Observation {
                timestamp: start + chrono::Duration::hours(h),
                location: "x".into(),
                hour_of_day: u8::try_from(h).unwrap(),
                temperature: 10.0 + f64::from(u8::try_from(h).unwrap()),
                auxiliary: [("humidity".to_owned(), 0.5)].into(),
            })
            .collect::<Vec<_>>();
        let table = ObservationTable::from_observations(&observations).unwrap();
        assert_eq!(table.column_names().count(), 5);

        let reparsed =
            ObservationTable::from_records(&table.to_records(), columns::TIMESTAMP).unwrap();
        assert_eq!(reparsed.column("timestamp"), table.column("timestamp"));
        assert_eq!(reparsed.column("humidity"), table.column("humidity"));
    }
}
