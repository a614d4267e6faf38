use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One hourly weather observation for a location.
///
/// Auxiliary numeric features are flattened into the record when serialized,
/// so an observation with a `humidity` feature reads as
/// `{"timestamp": ..., "location": ..., "hour_of_day": ..., "temperature": ..., "humidity": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub hour_of_day: u8,
    pub temperature: f64,
    #[serde(flatten)]
    pub auxiliary: BTreeMap<String, f64>,
}
