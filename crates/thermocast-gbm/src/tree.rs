//! Regression trees and greedy split search.
//!
//! Trees are stored as a flat node list with the root at index 0. Every node
//! records its cover, the number of training rows that reached it, which is
//! what path-dependent attribution needs to weigh unexplored branches.
//!
//! Feature values are passed around as `f64`. Categorical features carry their
//! level code cast to `f64`; `NaN` stands for a missing numeric value or a
//! category unseen during training. Both take the right branch.

use serde::{Deserialize, Serialize};
use thermocast_features::FeatureColumn;
use thermocast_stats::quantile;

use crate::GbmParams;

/// Decision made at a split node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitRule {
    /// Rows with `value <= threshold` go left.
    Threshold { threshold: f64 },
    /// Rows whose category code is set go left.
    Categories { left: Vec<bool> },
}

impl SplitRule {
    #[must_use]
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            Self::Threshold { threshold } => value <= *threshold,
            Self::Categories { left } => category_code(value)
                .and_then(|code| left.get(code).copied())
                .unwrap_or(false),
        }
    }
}

/// Decodes a category code stored as `f64`.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn category_code(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 0.0).then_some(value as usize)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        rule: SplitRule,
        left: usize,
        right: usize,
        gain: f64,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl Node {
    #[must_use]
    pub fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Follows the decisions from the root and returns the leaf value.
    ///
    /// `value_of` maps a feature index to the row's value.
    pub fn predict<F>(&self, value_of: F) -> f64
    where
        F: Fn(usize) -> f64,
    {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                    ..
                }) => {
                    index = if rule.goes_left(value_of(*feature)) {
                        *left
                    } else {
                        *right
                    };
                }
                Some(Node::Leaf { value, .. }) => return *value,
                None => return 0.0,
            }
        }
    }

    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.predict(|feature| row.get(feature).copied().unwrap_or(f64::NAN))
    }
}

/// Training view of one feature column.
#[derive(Debug)]
pub(crate) enum TrainColumn {
    Numeric {
        values: Vec<f64>,
        thresholds: Vec<f64>,
        /// Index of the first threshold `>= value`; `None` for `NaN`.
        bins: Vec<Option<usize>>,
    },
    Categorical {
        codes: Vec<usize>,
        n_levels: usize,
    },
}

impl TrainColumn {
    pub(crate) fn new(column: &FeatureColumn, max_bins: usize) -> Self {
        match column {
            FeatureColumn::Numeric(values) => {
                let thresholds =
                    quantile::split_candidates(&quantile::sorted_unique(values), max_bins);
                let bins = values
                    .iter()
                    .map(|&x| (!x.is_nan()).then(|| thresholds.partition_point(|&t| t < x)))
                    .collect();
                Self::Numeric {
                    values: values.clone(),
                    thresholds,
                    bins,
                }
            }
            FeatureColumn::Categorical { codes, levels } => Self::Categorical {
                codes: codes.clone(),
                n_levels: levels.len(),
            },
        }
    }

    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn value(&self, row: usize) -> f64 {
        match self {
            Self::Numeric { values, .. } => values[row],
            Self::Categorical { codes, .. } => codes[row] as f64,
        }
    }
}

#[derive(Debug)]
struct SplitCandidate {
    feature: usize,
    rule: SplitRule,
    gain: f64,
}

/// Greedy depth-first tree growth over squared-error gradients.
///
/// The hessian of squared error is 1, so hessian sums are row counts.
pub(crate) struct TreeBuilder<'a> {
    params: &'a GbmParams,
    columns: &'a [TrainColumn],
    gradients: &'a [f64],
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(
        params: &'a GbmParams,
        columns: &'a [TrainColumn],
        gradients: &'a [f64],
    ) -> Self {
        Self {
            params,
            columns,
            gradients,
            nodes: vec![],
        }
    }

    pub(crate) fn build(mut self, rows: &[usize]) -> Tree {
        self.grow(rows, 0);
        Tree { nodes: self.nodes }
    }

    #[expect(clippy::cast_precision_loss)]
    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let g = rows.iter().map(|&r| self.gradients[r]).sum::<f64>();
        let h = rows.len() as f64;

        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: -g / (h + self.params.reg_lambda) * self.params.learning_rate,
            cover: h,
        });
        if depth >= self.params.max_depth || rows.len() < 2 {
            return index;
        }
        let Some(best) = self.best_split(rows, g, h) else {
            return index;
        };

        let column = &self.columns[best.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| best.rule.goes_left(column.value(r)));
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        self.nodes[index] = Node::Split {
            feature: best.feature,
            rule: best.rule,
            left,
            right,
            gain: best.gain,
            cover: h,
        };
        index
    }

    fn gain(&self, gl: f64, hl: f64, gr: f64, hr: f64) -> Option<f64> {
        let min_weight = self.params.min_child_weight;
        if hl <= 0.0 || hr <= 0.0 || hl < min_weight || hr < min_weight {
            return None;
        }
        let lambda = self.params.reg_lambda;
        let score = |g: f64, h: f64| g * g / (h + lambda);
        let gain = 0.5 * (score(gl, hl) + score(gr, hr) - score(gl + gr, hl + hr));
        (gain > self.params.min_split_gain).then_some(gain)
    }

    /// Best split over all features; ties keep the earlier feature.
    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        for (feature, column) in self.columns.iter().enumerate() {
            let candidate = match column {
                TrainColumn::Numeric {
                    thresholds, bins, ..
                } => self.best_threshold(rows, g, h, thresholds, bins),
                TrainColumn::Categorical { codes, n_levels } => {
                    self.best_categories(rows, g, h, codes, *n_levels)
                }
            };
            if let Some((gain, rule)) = candidate
                && best.as_ref().is_none_or(|b| gain > b.gain)
            {
                best = Some(SplitCandidate {
                    feature,
                    rule,
                    gain,
                });
            }
        }
        best
    }

    fn best_threshold(
        &self,
        rows: &[usize],
        g: f64,
        h: f64,
        thresholds: &[f64],
        bins: &[Option<usize>],
    ) -> Option<(f64, SplitRule)> {
        let mut histogram = vec![(0.0, 0.0); thresholds.len() + 1];
        for &r in rows {
            if let Some(bin) = bins[r] {
                histogram[bin].0 += self.gradients[r];
                histogram[bin].1 += 1.0;
            }
        }

        let mut best: Option<(f64, usize)> = None;
        let (mut gl, mut hl) = (0.0, 0.0);
        for (i, (bin_g, bin_h)) in histogram[..thresholds.len()].iter().enumerate() {
            gl += bin_g;
            hl += bin_h;
            if let Some(gain) = self.gain(gl, hl, g - gl, h - hl)
                && best.is_none_or(|(b, _)| gain > b)
            {
                best = Some((gain, i));
            }
        }
        best.map(|(gain, i)| {
            (
                gain,
                SplitRule::Threshold {
                    threshold: thresholds[i],
                },
            )
        })
    }

    /// Orders the categories present in the node by mean gradient and scans
    /// the prefix partitions of that order.
    fn best_categories(
        &self,
        rows: &[usize],
        g: f64,
        h: f64,
        codes: &[usize],
        n_levels: usize,
    ) -> Option<(f64, SplitRule)> {
        let mut stats = vec![(0.0, 0.0); n_levels];
        for &r in rows {
            stats[codes[r]].0 += self.gradients[r];
            stats[codes[r]].1 += 1.0;
        }
        let mut present = (0..n_levels)
            .filter(|&c| stats[c].1 > 0.0)
            .collect::<Vec<_>>();
        present.sort_by(|&a, &b| {
            let mean = |c: usize| stats[c].0 / stats[c].1;
            mean(a).total_cmp(&mean(b))
        });

        let mut best: Option<(f64, usize)> = None;
        let (mut gl, mut hl) = (0.0, 0.0);
        for (k, &code) in present.iter().enumerate().take(present.len().saturating_sub(1)) {
            gl += stats[code].0;
            hl += stats[code].1;
            if let Some(gain) = self.gain(gl, hl, g - gl, h - hl)
                && best.is_none_or(|(b, _)| gain > b)
            {
                best = Some((gain, k + 1));
            }
        }
        best.map(|(gain, prefix)| {
            let mut left = vec![false; n_levels];
            for &code in &present[..prefix] {
                left[code] = true;
            }
            (gain, SplitRule::Categories { left })
        })
    }
}
