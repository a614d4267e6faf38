//! Per-partition temperature forecasting.
//!
//! [`WeatherPredictor`] ties the pipeline together for one partition's
//! time-ordered observations:
//!
//! 1. [`prepare_data`](WeatherPredictor::prepare_data) validates the table and
//!    adds the frequency-magnitude feature
//! 2. [`predict`](WeatherPredictor::predict) trains a boosted tree model on the
//!    prepared rows and scores those same rows
//! 3. [`calculate_global_shap`](WeatherPredictor::calculate_global_shap) ranks
//!    the features of the last trained model
//!
//! Predictions are a training-set fit: no rows are held out.
//!
//! # Lifecycle
//!
//! A predictor starts [`PredictorState::Untrained`]. A successful `predict`
//! replaces the state with [`PredictorState::Trained`]; a failed one leaves the
//! previous state in place.

use thermocast_data::{ColumnType, TableError};
use thermocast_features::{InvalidInputError, MatrixError, PrepareError};
use thermocast_gbm::{FitError, PredictError};

pub use self::predictor::{PredictionRow, PredictorState, TrainedForecast, WeatherPredictor};

pub mod predictor;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum PredictorError {
    #[display("missing required field(s): {}", fields.join(", "))]
    Schema { fields: Vec<String> },
    #[display("field '{field}' is {found}, expected {expected}")]
    Type {
        field: String,
        expected: ColumnType,
        found: ColumnType,
    },
    #[display("invalid input: {_0}")]
    InvalidInput(InvalidInputError),
    #[display("model not trained, run predict first")]
    NotTrained,
    #[display("failed to fit model: {_0}")]
    Fit(FitError),
    #[display("{_0}")]
    Table(TableError),
    #[display("{_0}")]
    Matrix(MatrixError),
    #[display("{_0}")]
    Predict(PredictError),
}

impl From<PrepareError> for PredictorError {
    fn from(error: PrepareError) -> Self {
        match error {
            PrepareError::Schema { fields } => Self::Schema { fields },
            PrepareError::Type {
                field,
                expected,
                found,
            } => Self::Type {
                field,
                expected,
                found,
            },
            PrepareError::InvalidInput(error) => Self::InvalidInput(error),
            PrepareError::Table(error) => Self::Table(error),
            PrepareError::Matrix(error) => Self::Matrix(error),
        }
    }
}
