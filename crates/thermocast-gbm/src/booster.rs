use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use thermocast_features::{FeatureColumn, FeatureKind, FeatureMatrix, TargetVector};
use thermocast_stats::metrics;
use tracing::{debug, info};

use crate::{
    FitError, GbmParams, PredictError,
    tree::{TrainColumn, Tree, TreeBuilder},
};

/// Name, kind and category levels of a training feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    pub kind: FeatureKind,
    /// Level table the split rules' category codes refer to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,
}

/// Feature values laid out in training column order.
///
/// Categorical values hold the training level code as `f64`, or `NaN` for a
/// level the model has not seen.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatrix {
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl EncodedMatrix {
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn value(&self, row: usize, feature: usize) -> f64 {
        self.columns[feature][row]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }
}

/// Gradient boosted regression trees with a squared-error objective.
#[derive(Debug, Clone, Default)]
pub struct ForecastModel {
    params: GbmParams,
}

impl ForecastModel {
    #[must_use]
    pub fn new(params: GbmParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Fits an ensemble to `target`.
    ///
    /// Starts from the target mean and adds one tree per round, each fit to
    /// the residual gradients of the current predictions.
    pub fn fit(
        &self,
        matrix: &FeatureMatrix,
        target: &TargetVector,
    ) -> Result<FittedModel, FitError> {
        self.params.validate()?;
        let targets = target.as_slice();
        if targets.is_empty() {
            return Err(FitError::EmptyInput);
        }
        if matrix.n_features() > 0 && matrix.n_rows() != targets.len() {
            return Err(FitError::LengthMismatch {
                rows: matrix.n_rows(),
                targets: targets.len(),
            });
        }
        if let Some((row, &value)) = targets.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(FitError::NonFiniteTarget { row, value });
        }

        let columns = matrix
            .features()
            .iter()
            .map(|f| TrainColumn::new(&f.column, self.params.max_bins))
            .collect::<Vec<_>>();
        #[expect(clippy::cast_precision_loss)]
        let base_score = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut predictions = vec![base_score; targets.len()];
        let mut rng = Pcg64Mcg::seed_from_u64(self.params.seed);

        info!(
            rows = targets.len(),
            features = matrix.n_features(),
            rounds = self.params.n_estimators,
            "training gradient boosted trees"
        );
        let mut trees = Vec::with_capacity(self.params.n_estimators);
        for round in 0..self.params.n_estimators {
            let gradients = predictions
                .iter()
                .zip(targets)
                .map(|(p, y)| p - y)
                .collect::<Vec<_>>();
            let rows = self.sample_rows(targets.len(), &mut rng);
            let tree = TreeBuilder::new(&self.params, &columns, &gradients).build(&rows);
            for (row, prediction) in predictions.iter_mut().enumerate() {
                *prediction += tree.predict(|feature| columns[feature].value(row));
            }
            debug!(
                round,
                leaves = tree.n_leaves(),
                rmse = metrics::rmse(targets, &predictions),
                "boosting round"
            );
            trees.push(tree);
        }
        info!(
            trees = trees.len(),
            rmse = metrics::rmse(targets, &predictions),
            "training finished"
        );

        let features = matrix
            .features()
            .iter()
            .map(|f| FeatureInfo {
                name: f.name.clone(),
                kind: f.column.kind(),
                levels: f.column.levels().to_vec(),
            })
            .collect();
        Ok(FittedModel {
            params: self.params.clone(),
            base_score,
            features,
            trees,
        })
    }

    fn sample_rows(&self, n_rows: usize, rng: &mut Pcg64Mcg) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n_rows).collect();
        }
        let rows = (0..n_rows)
            .filter(|_| rng.random::<f64>() < self.params.subsample)
            .collect::<Vec<_>>();
        if rows.is_empty() {
            vec![rng.random_range(0..n_rows)]
        } else {
            rows
        }
    }
}

/// A trained ensemble. Immutable; refitting produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    params: GbmParams,
    base_score: f64,
    features: Vec<FeatureInfo>,
    trees: Vec<Tree>,
}

impl FittedModel {
    #[must_use]
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Initial prediction before any tree is added (the training target mean).
    #[must_use]
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureInfo] {
        &self.features
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Lays out `matrix` in training feature order.
    ///
    /// Features are matched by name. Categorical levels are matched by value,
    /// so a matrix may list its levels in any order.
    pub fn encode(&self, matrix: &FeatureMatrix) -> Result<EncodedMatrix, PredictError> {
        let columns = self
            .features
            .iter()
            .map(|info| {
                let position =
                    matrix
                        .position(&info.name)
                        .ok_or_else(|| PredictError::MissingFeature {
                            name: info.name.clone(),
                        })?;
                let column = &matrix.features()[position].column;
                match (info.kind, column) {
                    (FeatureKind::Numeric, FeatureColumn::Numeric(values)) => Ok(values.clone()),
                    (FeatureKind::Categorical, FeatureColumn::Categorical { codes, levels }) => {
                        #[expect(clippy::cast_precision_loss)]
                        let remap = levels
                            .iter()
                            .map(|level| {
                                info.levels
                                    .iter()
                                    .position(|l| l == level)
                                    .map_or(f64::NAN, |code| code as f64)
                            })
                            .collect::<Vec<_>>();
                        Ok(codes.iter().map(|&c| remap[c]).collect())
                    }
                    _ => Err(PredictError::KindMismatch {
                        name: info.name.clone(),
                        expected: info.kind,
                        found: column.kind(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EncodedMatrix {
            columns,
            n_rows: matrix.n_rows(),
        })
    }

    /// Predicts one row given in training feature order.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    #[must_use]
    pub fn predict_encoded(&self, encoded: &EncodedMatrix) -> Vec<f64> {
        (0..encoded.n_rows())
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|t| t.predict(|feature| encoded.value(row, feature)))
                        .sum::<f64>()
            })
            .collect()
    }

    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, PredictError> {
        Ok(self.predict_encoded(&self.encode(matrix)?))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Uniform};

    use super::*;
    use crate::tree::Node;
    use thermocast_features::Feature;

    fn fit(features: Vec<Feature>, target: Vec<f64>, params: GbmParams) -> FittedModel {
        let matrix = FeatureMatrix::new(features).unwrap();
        ForecastModel::new(params)
            .fit(&matrix, &TargetVector::new(target))
            .unwrap()
    }

    #[test]
    fn test_fits_step_function() {
        let x = (0..20).map(f64::from).collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|&v| if v < 10.0 { 0.0 } else { 10.0 })
            .collect::<Vec<_>>();
        let matrix = FeatureMatrix::new(vec![Feature::numeric("x", x)]).unwrap();
        let model = ForecastModel::default()
            .fit(&matrix, &TargetVector::new(y.clone()))
            .unwrap();

        assert!((model.base_score() - 5.0).abs() < 1e-12);
        assert_eq!(model.trees().len(), 100);
        let predictions = model.predict(&matrix).unwrap();
        for (p, a) in predictions.iter().zip(&y) {
            assert!((p - a).abs() < 1e-3, "{p} vs {a}");
        }
    }

    #[test]
    fn test_no_rounds_predicts_mean() {
        let model = fit(
            vec![Feature::numeric("x", vec![1.0, 2.0, 3.0])],
            vec![1.0, 2.0, 6.0],
            GbmParams {
                n_estimators: 0,
                ..GbmParams::default()
            },
        );
        assert!((model.predict_row(&[10.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_learns_category_means() {
        let locations = ["a", "b", "c"].repeat(10);
        let target = locations
            .iter()
            .map(|l| match *l {
                "a" => 0.0,
                "b" => 5.0,
                _ => 10.0,
            })
            .collect::<Vec<_>>();
        let model = fit(
            vec![Feature::categorical("location", &locations)],
            target,
            GbmParams::default(),
        );
        assert!(matches!(
            &model.trees()[0].nodes()[0],
            Node::Split { feature: 0, .. }
        ));

        // levels listed in a different order are matched by name
        let shuffled = FeatureMatrix::new(vec![Feature::categorical("location", &["c", "a", "b"])])
            .unwrap();
        let predictions = model.predict(&shuffled).unwrap();
        assert!((predictions[0] - 10.0).abs() < 1e-3);
        assert!(predictions[1].abs() < 1e-3);
        assert!((predictions[2] - 5.0).abs() < 1e-3);

        let unseen = FeatureMatrix::new(vec![Feature::categorical("location", &["z"])]).unwrap();
        assert!(model.predict(&unseen).unwrap()[0].is_finite());
    }

    #[test]
    fn test_subsampling_is_seeded() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let uniform = Uniform::new(0.0, 1.0).unwrap();
        let x = (0..50)
            .map(|_| uniform.sample(&mut rng))
            .collect::<Vec<_>>();
        let y = x.iter().map(|v| v * 3.0).collect::<Vec<_>>();
        let params = GbmParams {
            subsample: 0.5,
            seed: 3,
            n_estimators: 10,
            ..GbmParams::default()
        };
        let a = fit(
            vec![Feature::numeric("x", x.clone())],
            y.clone(),
            params.clone(),
        );
        let b = fit(vec![Feature::numeric("x", x)], y, params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialized_model_predicts_the_same() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 1.5, 4.0, 4.2, 9.0, 8.5];
        let matrix = FeatureMatrix::new(vec![
            Feature::numeric("x", x),
            Feature::categorical("site", &["p", "q", "p", "q", "p", "q"]),
        ])
        .unwrap();
        let model = ForecastModel::default()
            .fit(&matrix, &TargetVector::new(y))
            .unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();
        let expected = model.predict(&matrix).unwrap();
        for (a, b) in restored.predict(&matrix).unwrap().iter().zip(&expected) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_errors() {
        let matrix = FeatureMatrix::new(vec![Feature::numeric("x", vec![1.0, 2.0])]).unwrap();
        let model = ForecastModel::default();
        assert!(matches!(
            model.fit(&matrix, &TargetVector::new(vec![])),
            Err(FitError::EmptyInput)
        ));
        assert!(matches!(
            model.fit(&matrix, &TargetVector::new(vec![1.0])),
            Err(FitError::LengthMismatch {
                rows: 2,
                targets: 1
            })
        ));
        assert!(matches!(
            model.fit(&matrix, &TargetVector::new(vec![1.0, f64::INFINITY])),
            Err(FitError::NonFiniteTarget { row: 1, .. })
        ));
        let model = ForecastModel::new(GbmParams {
            learning_rate: -0.1,
            ..GbmParams::default()
        });
        assert!(matches!(
            model.fit(&matrix, &TargetVector::new(vec![1.0, 2.0])),
            Err(FitError::InvalidParam {
                name: "learning_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_predict_checks_features() {
        let model = fit(
            vec![Feature::numeric("x", vec![1.0, 2.0])],
            vec![1.0, 2.0],
            GbmParams::default(),
        );
        let other = FeatureMatrix::new(vec![Feature::numeric("y", vec![1.0])]).unwrap();
        assert!(matches!(
            model.predict(&other),
            Err(PredictError::MissingFeature { .. })
        ));
        let other = FeatureMatrix::new(vec![Feature::categorical("x", &["a"])]).unwrap();
        assert!(matches!(
            model.predict(&other),
            Err(PredictError::KindMismatch { .. })
        ));
    }
}
