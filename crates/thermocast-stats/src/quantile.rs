//! Quantiles and split-candidate selection.
//!
//! [`compute_quantile`] uses the nearest-rank method. [`split_candidates`] turns the
//! distinct values of a numeric feature into at most `max_bins` thresholds for
//! `x <= threshold` style splits.

/// Computes a single quantile from sorted data using the nearest-rank method.
///
/// For `n` values the `q`-quantile (`0.0..=1.0`) is the value at position
/// `floor(n * q)`, clamped to the last index.
///
/// Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use thermocast_stats::quantile::compute_quantile;
///
/// let values = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_quantile(&values, 0.5), 3.0);
/// assert_eq!(compute_quantile(&values, 0.25), 2.0);
/// assert_eq!(compute_quantile(&values, 1.0), 5.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_quantile(sorted_values: &[f64], q: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let idx = (sorted_values.len() as f64 * q.clamp(0.0, 1.0)) as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

/// Returns the sorted, de-duplicated finite values of `values`.
#[must_use]
pub fn sorted_unique(values: &[f64]) -> Vec<f64> {
    let mut unique = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect::<Vec<_>>();
    unique.sort_by(f64::total_cmp);
    unique.dedup();
    unique
}

/// Computes candidate split thresholds from sorted distinct values.
///
/// Each threshold is the midpoint between two adjacent distinct values, so a
/// split `x <= threshold` never lands on an observed value. When there are more
/// midpoints than `max_bins`, the `k / max_bins` quantiles of the midpoints are
/// kept for `k = 1..=max_bins`.
///
/// # Panics
///
/// Panics if `sorted_unique` is not strictly increasing.
///
/// # Examples
///
/// ```
/// use thermocast_stats::quantile::split_candidates;
///
/// assert_eq!(split_candidates(&[1.0, 2.0, 4.0], 8), vec![1.5, 3.0]);
/// assert_eq!(split_candidates(&[1.0], 8), Vec::<f64>::new());
/// assert_eq!(split_candidates(&[0.0, 1.0, 2.0, 3.0, 4.0], 2), vec![2.5, 3.5]);
/// ```
#[must_use]
pub fn split_candidates(sorted_unique: &[f64], max_bins: usize) -> Vec<f64> {
    assert!(
        sorted_unique.is_sorted_by(|a, b| a < b),
        "values must be strictly increasing"
    );

    if max_bins == 0 {
        return vec![];
    }
    let midpoints = sorted_unique
        .windows(2)
        .map(|w| f64::midpoint(w[0], w[1]))
        .collect::<Vec<_>>();
    if midpoints.len() <= max_bins {
        return midpoints;
    }

    #[expect(clippy::cast_precision_loss)]
    let mut candidates = (1..=max_bins)
        .map(|k| compute_quantile(&midpoints, k as f64 / max_bins as f64))
        .collect::<Vec<_>>();
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_quantile() {
        assert!(compute_quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_sorted_unique_drops_non_finite() {
        let unique = sorted_unique(&[3.0, f64::NAN, 1.0, 3.0, f64::INFINITY, 2.0]);
        assert_eq!(unique, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_capped_candidates_are_increasing_and_in_range() {
        let values = (0..1000).map(f64::from).collect::<Vec<_>>();
        let candidates = split_candidates(&values, 16);
        assert_eq!(candidates.len(), 16);
        assert!(candidates.is_sorted_by(|a, b| a < b));
        assert!(candidates.iter().all(|&t| (0.0..999.0).contains(&t)));
        // the last gap is always represented
        assert!((candidates.last().unwrap() - 998.5).abs() < 1e-12);
    }

    #[test]
    fn test_capped_candidates_are_midpoint_quantiles() {
        let values = (0..=100).map(f64::from).collect::<Vec<_>>();
        let midpoints = values
            .windows(2)
            .map(|w| (w[0] + w[1]) / 2.0)
            .collect::<Vec<_>>();
        let candidates = split_candidates(&values, 4);
        let expected = [0.25, 0.5, 0.75, 1.0].map(|q| compute_quantile(&midpoints, q));
        assert_eq!(candidates, expected.to_vec());
    }
}
