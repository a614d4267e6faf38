//! Observation tables for per-partition temperature forecasting.
//!
//! Observations arrive as rows tagged by location and ordered in time. This crate
//! stores them column-wise in an [`ObservationTable`]: an ordered set of named,
//! equal-length, typed [`Column`]s. Row order is significant and every operation
//! here preserves it.
//!
//! Tables are built from:
//!
//! - typed [`Observation`] records ([`ObservationTable::from_observations`])
//! - loosely-typed JSON records with per-column type inference
//!   ([`ObservationTable::from_records`])
//! - seeded synthetic series ([`synthetic`]) for demos and tests
//!
//! # Example
//!
//! ```
//! use thermocast_data::{ObservationTable, columns};
//! use serde_json::json;
//!
//! let records = json!([
//!     {"location": "oslo", "hour_of_day": 0, "temperature": 3.5},
//!     {"location": "oslo", "hour_of_day": 1, "temperature": 3.1},
//! ]);
//! let records: Vec<serde_json::Map<String, serde_json::Value>> =
//!     serde_json::from_value(records).unwrap();
//! let table = ObservationTable::from_records(&records, columns::TIMESTAMP).unwrap();
//! assert_eq!(table.len(), 2);
//! assert!(table.column(columns::LOCATION).unwrap().is_categorical());
//! ```

pub use self::{
    column::{Column, ColumnType},
    observation::Observation,
    table::ObservationTable,
};

pub mod column;
pub mod observation;
pub mod synthetic;
pub mod table;

/// Default column names used by typed observations.
pub mod columns {
    pub const TIMESTAMP: &str = "timestamp";
    pub const LOCATION: &str = "location";
    pub const HOUR_OF_DAY: &str = "hour_of_day";
    pub const TEMPERATURE: &str = "temperature";
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("duplicate column '{name}'")]
    DuplicateColumn { name: String },
    #[display("column '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[display("column '{column}' not found")]
    MissingColumn { column: String },
    #[display("missing value for column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },
    #[display("column '{column}' mixes {first} and {second} values (row {row})")]
    MixedTypes {
        column: String,
        first: ColumnType,
        second: ColumnType,
        row: usize,
    },
    #[display("unsupported value for column '{column}' at row {row}: {value}")]
    UnsupportedValue {
        column: String,
        row: usize,
        value: serde_json::Value,
    },
    #[display("column '{column}' is {found}, expected {expected}")]
    UnexpectedType {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },
}
