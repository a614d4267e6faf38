use serde::{Deserialize, Serialize};

use crate::FitError;

/// Hyperparameters of the boosted ensemble.
///
/// Defaults follow the common `XGBoost` defaults and are fully deterministic:
/// with `subsample = 1.0` the seed is never consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f64,
    /// Maximum tree depth; a depth of 0 grows single-leaf trees.
    pub max_depth: usize,
    /// L2 regularization on leaf values.
    pub reg_lambda: f64,
    /// Minimum hessian sum (row count for squared error) in each child.
    pub min_child_weight: f64,
    /// A split is only made if its gain exceeds this value.
    pub min_split_gain: f64,
    /// Maximum number of candidate thresholds per numeric feature.
    pub max_bins: usize,
    /// Fraction of rows sampled for each tree.
    pub subsample: f64,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            min_split_gain: 0.0,
            max_bins: 256,
            subsample: 1.0,
            seed: 0,
        }
    }
}

impl GbmParams {
    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), FitError> {
        fn invalid(name: &'static str, message: String) -> Result<(), FitError> {
            Err(FitError::InvalidParam { name, message })
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(
                "learning_rate",
                format!("must be positive, got {}", self.learning_rate),
            );
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return invalid(
                "reg_lambda",
                format!("must be non-negative, got {}", self.reg_lambda),
            );
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return invalid(
                "min_child_weight",
                format!("must be non-negative, got {}", self.min_child_weight),
            );
        }
        if !self.min_split_gain.is_finite() {
            return invalid(
                "min_split_gain",
                format!("must be finite, got {}", self.min_split_gain),
            );
        }
        if self.max_bins == 0 {
            return invalid("max_bins", "must be at least 1".to_owned());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(
                "subsample",
                format!("must be in (0, 1], got {}", self.subsample),
            );
        }
        Ok(())
    }
}
