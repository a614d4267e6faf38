use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thermocast_attribution::{AttributionEngine, AttributionReport};
use thermocast_data::{Column, ObservationTable};
use thermocast_features::{
    FeatureMatrix, FeaturePipeline, FeatureSchema, PreparedTable, TargetVector,
};
use thermocast_gbm::{EncodedMatrix, FittedModel, ForecastModel, GbmParams};
use thermocast_stats::metrics::RegressionMetrics;
use tracing::info;

use crate::PredictorError;

/// One scored observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub timestamp: Option<DateTime<Utc>>,
    pub partition_key: Option<String>,
    pub hour_of_day: i64,
    pub actual_temperature: f64,
    pub predicted_temperature: f64,
}

/// A fitted model together with the exact matrix it was trained on.
#[derive(Debug, Clone)]
pub struct TrainedForecast {
    model: FittedModel,
    matrix: FeatureMatrix,
    encoded: EncodedMatrix,
    target: TargetVector,
    predictions: Vec<f64>,
}

impl TrainedForecast {
    #[must_use]
    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    #[must_use]
    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn target(&self) -> &TargetVector {
        &self.target
    }

    /// Predictions for the training rows.
    #[must_use]
    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    /// Training-set fit of the predictions.
    #[must_use]
    pub fn metrics(&self) -> Option<RegressionMetrics> {
        RegressionMetrics::new(self.target.as_slice(), &self.predictions)
    }

    /// Global attribution over the training matrix.
    #[must_use]
    pub fn global_shap(&self) -> AttributionReport {
        AttributionEngine::new(&self.model).global(&self.encoded)
    }
}

#[derive(Debug, Clone, Default, derive_more::IsVariant)]
pub enum PredictorState {
    #[default]
    Untrained,
    Trained(Box<TrainedForecast>),
}

/// Trains and explains a forecast for one partition of observations.
#[derive(Debug, Clone, Default)]
pub struct WeatherPredictor {
    pipeline: FeaturePipeline,
    params: GbmParams,
    state: PredictorState,
}

impl WeatherPredictor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_params(mut self, params: GbmParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.pipeline = FeaturePipeline::new(schema);
        self
    }

    #[must_use]
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        self.pipeline.schema()
    }

    #[must_use]
    pub fn state(&self) -> &PredictorState {
        &self.state
    }

    #[must_use]
    pub fn trained(&self) -> Option<&TrainedForecast> {
        match &self.state {
            PredictorState::Untrained => None,
            PredictorState::Trained(trained) => Some(trained.as_ref()),
        }
    }

    /// Adds the frequency-magnitude feature and drops the first row.
    ///
    /// The input table is left unchanged.
    pub fn prepare_data(&self, table: &ObservationTable) -> Result<PreparedTable, PredictorError> {
        Ok(self.pipeline.prepare(table)?)
    }

    /// Trains a model on the prepared observations and predicts them.
    ///
    /// Returns one row per prepared observation, in input order. On success the
    /// trained model replaces any previous one; on error the state is unchanged.
    pub fn predict(
        &mut self,
        table: &ObservationTable,
    ) -> Result<Vec<PredictionRow>, PredictorError> {
        let prepared = self.pipeline.prepare(table)?;
        let (matrix, target) = self.pipeline.split(&prepared)?;
        let model = ForecastModel::new(self.params.clone())
            .fit(&matrix, &target)
            .map_err(PredictorError::Fit)?;
        let encoded = model.encode(&matrix).map_err(PredictorError::Predict)?;
        let predictions = model.predict_encoded(&encoded);

        let rows = self.prediction_rows(&prepared, &target, &predictions);
        let trained = TrainedForecast {
            model,
            matrix,
            encoded,
            target,
            predictions,
        };
        if let Some(metrics) = trained.metrics() {
            info!(
                rows = rows.len(),
                mae = metrics.mae,
                rmse = metrics.rmse,
                r2 = metrics.r2,
                "trained forecast"
            );
        }
        self.state = PredictorState::Trained(Box::new(trained));
        Ok(rows)
    }

    /// Ranks features of the last trained model by mean absolute SHAP value.
    pub fn calculate_global_shap(&self) -> Result<AttributionReport, PredictorError> {
        self.trained()
            .map(TrainedForecast::global_shap)
            .ok_or(PredictorError::NotTrained)
    }

    fn prediction_rows(
        &self,
        prepared: &PreparedTable,
        target: &TargetVector,
        predictions: &[f64],
    ) -> Vec<PredictionRow> {
        let table = prepared.as_table();
        let schema = self.pipeline.schema();
        let timestamps = table
            .column(&schema.timestamp)
            .and_then(Column::as_timestamp);
        let partitions = table
            .column(&schema.partition_key)
            .and_then(Column::as_categorical);
        let hours = table
            .column(&schema.hour_of_day)
            .and_then(Column::as_integer)
            .unwrap_or_default();

        target
            .as_slice()
            .iter()
            .zip(predictions)
            .enumerate()
            .map(|(row, (&actual, &predicted))| PredictionRow {
                timestamp: timestamps.and_then(|t| t.get(row).copied()),
                partition_key: partitions.and_then(|p| p.get(row).cloned()),
                hour_of_day: hours.get(row).copied().unwrap_or_default(),
                actual_temperature: actual,
                predicted_temperature: predicted,
            })
            .collect()
    }
}
