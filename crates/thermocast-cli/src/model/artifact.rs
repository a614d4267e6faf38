use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thermocast_attribution::AttributionReport;
use thermocast_gbm::{FittedModel, GbmParams};
use thermocast_predictor::TrainedForecast;
use thermocast_stats::{descriptive::DescriptiveStats, metrics::RegressionMetrics};

/// A trained forecast saved to disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelArtifact {
    pub name: String,
    pub partition: Option<String>,
    pub trained_at: DateTime<Utc>,
    pub params: GbmParams,
    pub metrics: TrainingMetrics,
    pub residuals: Option<ResidualSummary>,
    pub attribution: AttributionReport,
    pub model: FittedModel,
}

/// Fit of the model on its own training rows.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TrainingMetrics {
    pub rows: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Distribution of `actual - predicted` over the training rows.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ResidualSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl From<DescriptiveStats> for ResidualSummary {
    fn from(stats: DescriptiveStats) -> Self {
        Self {
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            std_dev: stats.std_dev,
        }
    }
}

impl TrainingMetrics {
    /// Training-set fit; `NaN` metrics when there are no rows.
    pub fn from_trained(trained: &TrainedForecast) -> Self {
        trained.metrics().map_or(
            Self {
                rows: 0,
                mae: f64::NAN,
                rmse: f64::NAN,
                r2: f64::NAN,
            },
            |RegressionMetrics { mae, rmse, r2 }| Self {
                rows: trained.predictions().len(),
                mae,
                rmse,
                r2,
            },
        )
    }
}

impl ResidualSummary {
    /// Summary of `actual - predicted` over the training rows.
    pub fn from_trained(trained: &TrainedForecast) -> Option<Self> {
        DescriptiveStats::new(
            trained
                .target()
                .as_slice()
                .iter()
                .zip(trained.predictions())
                .map(|(actual, predicted)| actual - predicted),
        )
        .map(Self::from)
    }
}

impl ModelArtifact {
    /// Builds the saved form of a trained forecast, including its attribution
    /// report.
    pub fn from_trained(name: &str, partition: Option<&str>, trained: &TrainedForecast) -> Self {
        Self {
            name: name.to_owned(),
            partition: partition.map(str::to_owned),
            trained_at: Utc::now(),
            params: trained.model().params().clone(),
            metrics: TrainingMetrics::from_trained(trained),
            residuals: ResidualSummary::from_trained(trained),
            attribution: trained.global_shap(),
            model: trained.model().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use thermocast_data::{
        ObservationTable,
        synthetic::{self, SyntheticConfig},
    };
    use thermocast_predictor::WeatherPredictor;

    use super::*;

    fn trained_predictor() -> WeatherPredictor {
        let config = SyntheticConfig {
            locations: vec!["oslo".into()],
            hours: 48,
            noise_std_dev: 0.0,
            ..SyntheticConfig::default()
        };
        let observations = synthetic::generate(&config).unwrap();
        let table = ObservationTable::from_observations(&observations).unwrap();
        let mut predictor = WeatherPredictor::new().with_params(GbmParams {
            n_estimators: 10,
            ..GbmParams::default()
        });
        predictor.predict(&table).unwrap();
        predictor
    }

    #[test]
    fn test_metrics_and_residuals_cover_training_rows() {
        let predictor = trained_predictor();
        let trained = predictor.trained().unwrap();

        let metrics = TrainingMetrics::from_trained(trained);
        assert_eq!(metrics.rows, 47);
        assert!(metrics.mae.is_finite() && metrics.mae >= 0.0);

        let residuals = ResidualSummary::from_trained(trained).unwrap();
        assert!(residuals.min <= residuals.median && residuals.median <= residuals.max);
        assert!(residuals.mean.abs() <= metrics.mae + 1e-12);
    }

    #[test]
    fn test_artifact_carries_model_and_attribution() {
        let predictor = trained_predictor();
        let trained = predictor.trained().unwrap();

        let artifact = ModelArtifact::from_trained("test", Some("oslo"), trained);
        assert_eq!(artifact.partition.as_deref(), Some("oslo"));
        assert_eq!(artifact.metrics.rows, 47);
        assert_eq!(&artifact.model, trained.model());
        assert_eq!(artifact.attribution, trained.global_shap());
    }
}
