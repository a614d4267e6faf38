//! Exact path-dependent `TreeSHAP`.
//!
//! Computes Shapley values of a tree ensemble in polynomial time by tracking,
//! along every root-to-leaf path, the fraction of feature subsets that flow
//! through each branch (Lundberg et al., "Consistent Individualized Feature
//! Attribution for Tree Ensembles", algorithm 2).
//!
//! Absent features are marginalized with the training cover of each node, so
//! the values satisfy local accuracy:
//!
//! ```text
//! expected_value + Σ φ_j = prediction
//! ```

use thermocast_gbm::{EncodedMatrix, FittedModel, Node, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the synthetic root element.
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

impl PathElement {
    const EMPTY: Self = Self {
        feature: None,
        zero_fraction: 0.0,
        one_fraction: 0.0,
        pweight: 0.0,
    };
}

#[expect(clippy::cast_precision_loss)]
fn extend_path(
    path: &mut [PathElement],
    unique_depth: usize,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    path[unique_depth] = PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if unique_depth == 0 { 1.0 } else { 0.0 },
    };
    let depth = (unique_depth + 1) as f64;
    for i in (0..unique_depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / depth;
        path[i].pweight = zero_fraction * path[i].pweight * (unique_depth - i) as f64 / depth;
    }
}

#[expect(clippy::cast_precision_loss)]
fn unwind_path(path: &mut [PathElement], unique_depth: usize, path_index: usize) {
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[path_index];
    let depth = (unique_depth + 1) as f64;
    let mut next_one_portion = path[unique_depth].pweight;

    for i in (0..unique_depth).rev() {
        if one_fraction == 0.0 {
            path[i].pweight = path[i].pweight * depth / (zero_fraction * (unique_depth - i) as f64);
        } else {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * depth / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                tmp - path[i].pweight * zero_fraction * (unique_depth - i) as f64 / depth;
        }
    }
    for i in path_index..unique_depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

/// Total permutation weight of the path with element `path_index` removed.
#[expect(clippy::cast_precision_loss)]
fn unwound_path_sum(path: &[PathElement], unique_depth: usize, path_index: usize) -> f64 {
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[path_index];
    let depth = (unique_depth + 1) as f64;
    let mut next_one_portion = path[unique_depth].pweight;
    let mut total = 0.0;

    for i in (0..unique_depth).rev() {
        let remaining = (unique_depth - i) as f64 / depth;
        if one_fraction != 0.0 {
            let tmp = next_one_portion * depth / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * remaining;
        } else if zero_fraction != 0.0 {
            total += path[i].pweight / zero_fraction / remaining;
        }
    }
    total
}

struct Walk<'a> {
    tree: &'a Tree,
    row: &'a [f64],
    phi: &'a mut [f64],
}

impl Walk<'_> {
    fn recurse(
        &mut self,
        node: usize,
        parent_path: &[PathElement],
        mut unique_depth: usize,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        let mut path = parent_path[..unique_depth].to_vec();
        path.push(PathElement::EMPTY);
        extend_path(
            &mut path,
            unique_depth,
            zero_fraction,
            one_fraction,
            feature,
        );

        let tree = self.tree;
        let nodes = tree.nodes();
        match &nodes[node] {
            Node::Leaf { value, .. } => {
                for i in 1..=unique_depth {
                    let weight = unwound_path_sum(&path, unique_depth, i);
                    let element = path[i];
                    if let Some(j) = element.feature {
                        self.phi[j] +=
                            weight * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            Node::Split {
                feature: split_feature,
                rule,
                left,
                right,
                cover,
                ..
            } => {
                let value = self.row.get(*split_feature).copied().unwrap_or(f64::NAN);
                let (hot, cold) = if rule.goes_left(value) {
                    (*left, *right)
                } else {
                    (*right, *left)
                };
                let hot_zero_fraction = nodes[hot].cover() / cover;
                let cold_zero_fraction = nodes[cold].cover() / cover;

                // a feature seen earlier on the path is merged into one element
                let mut incoming_zero_fraction = 1.0;
                let mut incoming_one_fraction = 1.0;
                if let Some(path_index) = path[..=unique_depth]
                    .iter()
                    .position(|e| e.feature == Some(*split_feature))
                {
                    incoming_zero_fraction = path[path_index].zero_fraction;
                    incoming_one_fraction = path[path_index].one_fraction;
                    unwind_path(&mut path, unique_depth, path_index);
                    unique_depth -= 1;
                }

                self.recurse(
                    hot,
                    &path,
                    unique_depth + 1,
                    hot_zero_fraction * incoming_zero_fraction,
                    incoming_one_fraction,
                    Some(*split_feature),
                );
                self.recurse(
                    cold,
                    &path,
                    unique_depth + 1,
                    cold_zero_fraction * incoming_zero_fraction,
                    0.0,
                    Some(*split_feature),
                );
            }
        }
    }
}

/// Cover-weighted mean leaf value of a tree.
fn tree_expectation(tree: &Tree, node: usize) -> f64 {
    let nodes = tree.nodes();
    match &nodes[node] {
        Node::Leaf { value, .. } => *value,
        Node::Split {
            left, right, cover, ..
        } => {
            (nodes[*left].cover() * tree_expectation(tree, *left)
                + nodes[*right].cover() * tree_expectation(tree, *right))
                / cover
        }
    }
}

/// SHAP values of a [`FittedModel`].
#[derive(Debug, Clone, Copy)]
pub struct TreeExplainer<'a> {
    model: &'a FittedModel,
}

impl<'a> TreeExplainer<'a> {
    #[must_use]
    pub fn new(model: &'a FittedModel) -> Self {
        Self { model }
    }

    /// Model output when no feature is known: the base score plus the
    /// cover-weighted expectation of every tree.
    #[must_use]
    pub fn expected_value(&self) -> f64 {
        self.model.base_score()
            + self
                .model
                .trees()
                .iter()
                .filter(|t| !t.nodes().is_empty())
                .map(|t| tree_expectation(t, 0))
                .sum::<f64>()
    }

    /// Attributions of one row given in training feature order.
    #[must_use]
    pub fn shap_values_row(&self, row: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.model.features().len()];
        for tree in self.model.trees() {
            if tree.nodes().is_empty() {
                continue;
            }
            let mut walk = Walk {
                tree,
                row,
                phi: &mut phi,
            };
            walk.recurse(0, &[], 0, 1.0, 1.0, None);
        }
        phi
    }

    /// Attributions of every row, `result[row][feature]`.
    #[must_use]
    pub fn shap_values(&self, encoded: &EncodedMatrix) -> Vec<Vec<f64>> {
        (0..encoded.n_rows())
            .map(|row| self.shap_values_row(&encoded.row(row)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;
    use thermocast_features::{Feature, FeatureMatrix, TargetVector};
    use thermocast_gbm::{ForecastModel, GbmParams};

    use super::*;

    fn fit(matrix: &FeatureMatrix, target: Vec<f64>, params: GbmParams) -> FittedModel {
        ForecastModel::new(params)
            .fit(matrix, &TargetVector::new(target))
            .unwrap()
    }

    #[test]
    fn test_single_stump_values() {
        let matrix = FeatureMatrix::new(vec![Feature::numeric("x", vec![0.0, 1.0])]).unwrap();
        let model = fit(
            &matrix,
            vec![0.0, 1.0],
            GbmParams {
                n_estimators: 1,
                learning_rate: 1.0,
                reg_lambda: 0.0,
                ..GbmParams::default()
            },
        );
        let explainer = TreeExplainer::new(&model);
        assert!((explainer.expected_value() - 0.5).abs() < 1e-12);
        assert!((explainer.shap_values_row(&[0.0])[0] + 0.5).abs() < 1e-12);
        assert!((explainer.shap_values_row(&[1.0])[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_feature_on_path() {
        // three plateaus force the same feature to be split twice
        let x = (0..30).map(f64::from).collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|&v| (v / 10.0).floor() * 4.0)
            .collect::<Vec<_>>();
        let matrix = FeatureMatrix::new(vec![Feature::numeric("x", x)]).unwrap();
        let model = fit(&matrix, y, GbmParams::default());
        let explainer = TreeExplainer::new(&model);

        let encoded = model.encode(&matrix).unwrap();
        let predictions = model.predict_encoded(&encoded);
        for (row, phi) in explainer.shap_values(&encoded).iter().enumerate() {
            let expected = predictions[row] - explainer.expected_value();
            assert!((phi[0] - expected).abs() < 1e-9, "row {row}");
        }
    }

    #[test]
    fn test_local_accuracy_with_mixed_features() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let n = 60;
        let a = (0..n)
            .map(|_| rng.random_range(0.0..10.0))
            .collect::<Vec<f64>>();
        let b = (0..n)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect::<Vec<f64>>();
        let sites = (0..n)
            .map(|i| ["north", "south", "east"][i % 3])
            .collect::<Vec<_>>();
        let y = (0..n)
            .map(|i| a[i].sin() * 3.0 + b[i] * b[i] + if i % 3 == 1 { 2.0 } else { 0.0 })
            .collect::<Vec<_>>();
        let matrix = FeatureMatrix::new(vec![
            Feature::numeric("a", a),
            Feature::categorical("site", &sites),
            Feature::numeric("b", b),
        ])
        .unwrap();
        let model = fit(
            &matrix,
            y,
            GbmParams {
                n_estimators: 20,
                max_depth: 4,
                ..GbmParams::default()
            },
        );
        let explainer = TreeExplainer::new(&model);
        let encoded = model.encode(&matrix).unwrap();
        let predictions = model.predict_encoded(&encoded);
        let base = explainer.expected_value();

        for (row, phi) in explainer.shap_values(&encoded).iter().enumerate() {
            let total = base + phi.iter().sum::<f64>();
            assert!(
                (total - predictions[row]).abs() < 1e-8,
                "row {row}: {total} != {}",
                predictions[row]
            );
        }
    }

    #[test]
    fn test_unused_feature_gets_zero() {
        let matrix = FeatureMatrix::new(vec![
            Feature::numeric("x", vec![0.0, 1.0, 2.0, 3.0]),
            Feature::numeric("constant", vec![1.0; 4]),
        ])
        .unwrap();
        let model = fit(&matrix, vec![1.0, 2.0, 3.0, 4.0], GbmParams::default());
        let explainer = TreeExplainer::new(&model);
        for row in [[0.0, 1.0], [3.0, 1.0], [1.5, 7.0]] {
            assert!(explainer.shap_values_row(&row)[1].abs() < 1e-12);
        }
    }
}
