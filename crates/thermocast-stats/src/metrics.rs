//! Goodness-of-fit measures for regression models.

use std::iter;

/// Error metrics comparing actual values with predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Coefficient of determination.
    ///
    /// Defined as `1.0` for a perfect fit of a constant target and `0.0` for any
    /// other fit of a constant target.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Computes MAE, RMSE and R² between `actual` and `predicted`.
    ///
    /// Returns `None` if the slices are empty or differ in length.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }

        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;
        let (abs_sum, sq_sum) = iter::zip(actual, predicted).fold((0.0, 0.0), |(abs, sq), (a, p)| {
            let diff = a - p;
            (abs + diff.abs(), sq + diff * diff)
        });
        let ss_tot = actual.iter().map(|a| (a - mean).powi(2)).sum::<f64>();

        let r2 = if ss_tot > 0.0 {
            1.0 - sq_sum / ss_tot
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };

        Some(Self {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            r2,
        })
    }
}

/// Root mean squared error between `actual` and `predicted`.
///
/// Returns `NaN` for empty or mismatched input.
#[must_use]
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    RegressionMetrics::new(actual, predicted).map_or(f64::NAN, |m| m.rmse)
}
