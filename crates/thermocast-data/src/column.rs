use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Logical type of a [`Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[display("numeric")]
    Numeric,
    #[display("integer")]
    Integer,
    #[display("categorical")]
    Categorical,
    #[display("timestamp")]
    Timestamp,
}

/// A single typed column of an observation table.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum Column {
    Numeric(Vec<f64>),
    Integer(Vec<i64>),
    Categorical(Vec<String>),
    Timestamp(Vec<DateTime<Utc>>),
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Integer(values) => values.len(),
            Self::Categorical(values) => values.len(),
            Self::Timestamp(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Numeric(_) => ColumnType::Numeric,
            Self::Integer(_) => ColumnType::Integer,
            Self::Categorical(_) => ColumnType::Categorical,
            Self::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    /// Reads a numeric or integer column as `f64` values.
    ///
    /// Returns `None` for categorical and timestamp columns.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Self::Numeric(values) => Some(values.clone()),
            Self::Integer(values) => Some(values.iter().map(|&v| v as f64).collect()),
            Self::Categorical(_) | Self::Timestamp(_) => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<&[i64]> {
        match self {
            Self::Integer(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_categorical(&self) -> Option<&[String]> {
        match self {
            Self::Categorical(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::Timestamp(values) => Some(values),
            _ => None,
        }
    }

    /// Returns a new column without the first `count` rows.
    #[must_use]
    pub fn skip_rows(&self, count: usize) -> Self {
        fn tail<T: Clone>(values: &[T], count: usize) -> Vec<T> {
            values.get(count..).unwrap_or_default().to_vec()
        }
        match self {
            Self::Numeric(values) => Self::Numeric(tail(values, count)),
            Self::Integer(values) => Self::Integer(tail(values, count)),
            Self::Categorical(values) => Self::Categorical(tail(values, count)),
            Self::Timestamp(values) => Self::Timestamp(tail(values, count)),
        }
    }

    /// Returns a new column containing the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Self::Numeric(values) => Self::Numeric(pick(values, indices)),
            Self::Integer(values) => Self::Integer(pick(values, indices)),
            Self::Categorical(values) => Self::Categorical(pick(values, indices)),
            Self::Timestamp(values) => Self::Timestamp(pick(values, indices)),
        }
    }

    /// Returns the cell at `row` as a JSON value.
    ///
    /// Non-finite numeric values become `null`.
    #[must_use]
    pub fn json_value(&self, row: usize) -> Option<serde_json::Value> {
        let value = match self {
            Self::Numeric(values) => serde_json::Value::from(*values.get(row)?),
            Self::Integer(values) => serde_json::Value::from(*values.get(row)?),
            Self::Categorical(values) => serde_json::Value::from(values.get(row)?.as_str()),
            Self::Timestamp(values) => serde_json::Value::from(
                values.get(row)?.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widens_to_f64() {
        let column = Column::Integer(vec![1, -2, 3]);
        assert_eq!(column.to_f64_vec(), Some(vec![1.0, -2.0, 3.0]));
        assert!(Column::Categorical(vec!["a".into()]).to_f64_vec().is_none());
    }

    #[test]
    fn test_skip_rows_past_end_is_empty() {
        let column = Column::Numeric(vec![1.0, 2.0]);
        assert_eq!(column.skip_rows(1), Column::Numeric(vec![2.0]));
        assert!(column.skip_rows(5).is_empty());
    }

    #[test]
    fn test_json_value_non_finite_is_null() {
        let column = Column::Numeric(vec![f64::NAN]);
        assert_eq!(column.json_value(0), Some(serde_json::Value::Null));
        assert_eq!(column.json_value(1), None);
    }
}
