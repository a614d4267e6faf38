//! Gradient boosted regression trees.
//!
//! [`ForecastModel`] fits an additive ensemble of regression trees to a
//! [`FeatureMatrix`](thermocast_features::FeatureMatrix) with a squared-error
//! objective and returns an immutable [`FittedModel`].
//!
//! # Algorithm Overview
//!
//! 1. **Base score** - Predictions start at the mean of the target
//! 2. **Gradients** - Each round computes `g = prediction - target` (hessian 1)
//! 3. **Tree growth** - A depth-first tree is grown on the gradients, choosing at
//!    every node the split with the highest gain
//! 4. **Update** - Leaf values `-G / (H + λ) · η` are added to the predictions
//!
//! The gain of splitting a node into `L` and `R` is
//!
//! ```text
//! gain = ½ · [G_L² / (H_L + λ) + G_R² / (H_R + λ) - G² / (H + λ)]
//! ```
//!
//! and a split is kept only if its gain exceeds
//! [`GbmParams::min_split_gain`] and both children reach
//! [`GbmParams::min_child_weight`].
//!
//! # Splits
//!
//! - **Numeric** features split on `value <= threshold`. Thresholds are the
//!   midpoints between consecutive distinct training values, thinned to at most
//!   [`GbmParams::max_bins`] evenly spaced candidates.
//! - **Categorical** features split on a category set. The categories present in
//!   the node are ordered by mean gradient and every prefix of that order is a
//!   candidate left set.
//!
//! Missing numeric values and categories not seen in training go right. When
//! two features give the same gain the one earlier in the matrix wins.
//!
//! # Example
//!
//! ```
//! use thermocast_features::{Feature, FeatureMatrix, TargetVector};
//! use thermocast_gbm::{ForecastModel, GbmParams};
//!
//! let matrix = FeatureMatrix::new(vec![Feature::numeric("x", vec![0.0, 1.0, 2.0, 3.0])]).unwrap();
//! let target = TargetVector::new(vec![0.0, 0.0, 1.0, 1.0]);
//! let model = ForecastModel::new(GbmParams::default()).fit(&matrix, &target).unwrap();
//!
//! let predictions = model.predict(&matrix).unwrap();
//! assert!(predictions[0] < 0.1 && predictions[3] > 0.9);
//! ```

use thermocast_features::FeatureKind;

pub use self::{
    booster::{EncodedMatrix, FeatureInfo, FittedModel, ForecastModel},
    params::GbmParams,
    tree::{Node, SplitRule, Tree},
};

pub mod booster;
pub mod params;
pub mod tree;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("cannot fit a model to an empty target")]
    EmptyInput,
    #[display("feature matrix has {rows} rows but the target has {targets}")]
    LengthMismatch { rows: usize, targets: usize },
    #[display("target value {value} at row {row} is not finite")]
    NonFiniteTarget { row: usize, value: f64 },
    #[display("invalid parameter {name}: {message}")]
    InvalidParam { name: &'static str, message: String },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PredictError {
    #[display("feature '{name}' used in training is missing")]
    MissingFeature { name: String },
    #[display("feature '{name}' is {found}, the model was trained on {expected}")]
    KindMismatch {
        name: String,
        expected: FeatureKind,
        found: FeatureKind,
    },
}
