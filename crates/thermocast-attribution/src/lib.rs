//! Global feature attribution for fitted forecast models.
//!
//! [`AttributionEngine`] explains every row of a matrix with exact `TreeSHAP`
//! ([`tree_shap`]) and averages the absolute per-row values into an
//! [`AttributionReport`]. No sampling is involved, so the same model and
//! matrix always produce the same report.

use thermocast_features::FeatureMatrix;
use thermocast_gbm::{EncodedMatrix, FittedModel, PredictError};

pub use self::{
    report::{AttributionReport, FeatureAttribution},
    tree_shap::TreeExplainer,
};

pub mod report;
pub mod tree_shap;

#[derive(Debug, Clone, Copy)]
pub struct AttributionEngine<'a> {
    model: &'a FittedModel,
}

impl<'a> AttributionEngine<'a> {
    #[must_use]
    pub fn new(model: &'a FittedModel) -> Self {
        Self { model }
    }

    /// Ranks the model's features over rows already encoded for it.
    #[must_use]
    pub fn global(&self, encoded: &EncodedMatrix) -> AttributionReport {
        let explainer = TreeExplainer::new(self.model);
        let shap_values = explainer.shap_values(encoded);
        let names = self.model.feature_names().collect::<Vec<_>>();
        tracing::debug!(
            rows = encoded.n_rows(),
            features = names.len(),
            "computed shap values"
        );
        AttributionReport::from_shap_values(&names, &shap_values, explainer.expected_value())
    }

    /// Encodes `matrix` for the model and ranks its features.
    pub fn explain(&self, matrix: &FeatureMatrix) -> Result<AttributionReport, PredictError> {
        Ok(self.global(&self.model.encode(matrix)?))
    }
}

#[cfg(test)]
mod tests {
    use thermocast_features::{Feature, TargetVector};
    use thermocast_gbm::{ForecastModel, GbmParams};

    use super::*;

    fn model_and_matrix() -> (FittedModel, FeatureMatrix) {
        let hour = (0..24).map(f64::from).collect::<Vec<_>>();
        let noise = (0..24)
            .map(|i| f64::from((i * 7) % 5) / 5.0)
            .collect::<Vec<_>>();
        let target = hour
            .iter()
            .map(|h| (std::f64::consts::TAU * h / 24.0).sin() * 10.0)
            .collect::<Vec<_>>();
        let matrix = FeatureMatrix::new(vec![
            Feature::numeric("hour", hour),
            Feature::numeric("noise", noise),
        ])
        .unwrap();
        let model = ForecastModel::new(GbmParams::default())
            .fit(&matrix, &TargetVector::new(target))
            .unwrap();
        (model, matrix)
    }

    #[test]
    fn test_report_is_sorted_and_non_negative() {
        let (model, matrix) = model_and_matrix();
        let report = AttributionEngine::new(&model).explain(&matrix).unwrap();
        assert_eq!(report.features.len(), 2);
        assert!(report.iter().all(|f| f.importance >= 0.0));
        assert!(
            report
                .features
                .windows(2)
                .all(|w| w[0].importance >= w[1].importance)
        );
        assert_eq!(report.rank("hour"), Some(0));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let (model, matrix) = model_and_matrix();
        let engine = AttributionEngine::new(&model);
        let first = engine.explain(&matrix).unwrap();
        let second = engine.explain(&matrix).unwrap();
        assert_eq!(first, second);
    }
}
