use serde::{Deserialize, Serialize};
use thermocast_data::columns;

/// Names of the columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    /// Regression target, also the signal fed to the normalizer.
    pub temperature: String,
    pub hour_of_day: String,
    /// Excluded from predictors.
    pub timestamp: String,
    /// Categorical key the observations are grouped by.
    pub partition_key: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            temperature: columns::TEMPERATURE.to_owned(),
            hour_of_day: columns::HOUR_OF_DAY.to_owned(),
            timestamp: columns::TIMESTAMP.to_owned(),
            partition_key: columns::LOCATION.to_owned(),
        }
    }
}

impl FeatureSchema {
    /// Fields that must be present in every input table.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> + '_ {
        [self.temperature.as_str(), self.hour_of_day.as_str()].into_iter()
    }
}
