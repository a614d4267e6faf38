//! Feature preparation for temperature forecasting.
//!
//! [`FeaturePipeline`] validates an [`ObservationTable`](thermocast_data::ObservationTable)
//! against a [`FeatureSchema`], derives a frequency-domain column from the
//! temperature sequence with [`SignalNormalizer`], and splits the result into a
//! [`FeatureMatrix`] and [`TargetVector`].
//!
//! The derived column holds the magnitudes of DFT bins `1..n` of the whole
//! temperature sequence. The zero-frequency bin has no partner row, so the
//! first observation is dropped and bin `k` lines up with row `k`.

pub use self::{
    matrix::{Feature, FeatureColumn, FeatureKind, FeatureMatrix, MatrixError, TargetVector},
    pipeline::{FeaturePipeline, InvalidInputError, PrepareError, PreparedTable},
    schema::FeatureSchema,
    signal::{SignalError, SignalNormalizer},
};

pub mod matrix;
pub mod pipeline;
pub mod schema;
pub mod signal;

/// Name of the derived frequency-domain column.
pub const FREQUENCY_MAGNITUDE: &str = "frequency_magnitude";
