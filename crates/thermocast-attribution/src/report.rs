use serde::{Deserialize, Serialize};

/// Global importance of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    /// Mean absolute SHAP value over the explained rows.
    pub importance: f64,
}

/// Features ranked by global importance, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionReport {
    /// Expected model output the attributions are measured from.
    pub base_value: f64,
    /// Number of rows the importances were averaged over.
    pub rows: usize,
    pub features: Vec<FeatureAttribution>,
}

impl AttributionReport {
    /// Builds a report from per-row attributions, `shap_values[row][feature]`.
    ///
    /// Features are sorted by descending importance. The sort is stable, so
    /// equal importances keep the order of `names`.
    #[must_use]
    pub fn from_shap_values<S>(names: &[S], shap_values: &[Vec<f64>], base_value: f64) -> Self
    where
        S: AsRef<str>,
    {
        let rows = shap_values.len();
        let mut totals = vec![0.0; names.len()];
        for phi in shap_values {
            for (total, value) in totals.iter_mut().zip(phi) {
                *total += value.abs();
            }
        }
        #[expect(clippy::cast_precision_loss)]
        let mut features = names
            .iter()
            .zip(totals)
            .map(|(name, total)| FeatureAttribution {
                feature: name.as_ref().to_owned(),
                importance: if rows == 0 { 0.0 } else { total / rows as f64 },
            })
            .collect::<Vec<_>>();
        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        Self {
            base_value,
            rows,
            features,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureAttribution> + '_ {
        self.features.iter()
    }

    #[must_use]
    pub fn importance(&self, feature: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|f| f.feature == feature)
            .map(|f| f.importance)
    }

    /// Position of `feature` in the ranking, 0 for the most important.
    #[must_use]
    pub fn rank(&self, feature: &str) -> Option<usize> {
        self.features.iter().position(|f| f.feature == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_absolute_value_sorted_descending() {
        let report = AttributionReport::from_shap_values(
            &["a", "b", "c"],
            &[vec![1.0, -4.0, 0.0], vec![-3.0, 2.0, 0.0]],
            10.0,
        );
        let ranked = report
            .iter()
            .map(|f| (f.feature.as_str(), f.importance))
            .collect::<Vec<_>>();
        assert_eq!(ranked, [("b", 3.0), ("a", 2.0), ("c", 0.0)]);
        assert_eq!(report.rows, 2);
        assert_eq!(report.rank("a"), Some(1));
    }

    #[test]
    fn test_ties_keep_column_order() {
        let report =
            AttributionReport::from_shap_values(&["x", "y", "z"], &[vec![1.0, 2.0, 1.0]], 0.0);
        let order = report
            .iter()
            .map(|f| f.feature.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, ["y", "x", "z"]);
    }

    #[test]
    fn test_no_rows() {
        let report = AttributionReport::from_shap_values(&["x"], &[], 0.0);
        assert_eq!(report.importance("x"), Some(0.0));
    }

    #[test]
    fn test_serializes_as_feature_importance_rows() {
        let report = AttributionReport::from_shap_values(&["x"], &[vec![-0.5]], 1.0);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json["features"],
            serde_json::json!([{"feature": "x", "importance": 0.5}])
        );
    }
}
