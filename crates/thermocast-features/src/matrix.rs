//! Model-ready feature matrix and target vector.

use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum MatrixError {
    #[display("feature '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[display("duplicate feature '{name}'")]
    DuplicateFeature { name: String },
    #[display("feature '{name}' has code {code} but only {levels} level(s)")]
    InvalidCode {
        name: String,
        code: usize,
        levels: usize,
    },
}

/// How a feature is split by the model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    #[display("numeric")]
    Numeric,
    #[display("categorical")]
    Categorical,
}

/// Values of one feature column.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    Numeric(Vec<f64>),
    /// Integer codes into `levels`; levels are listed in first-appearance order.
    Categorical {
        codes: Vec<usize>,
        levels: Vec<String>,
    },
}

impl FeatureColumn {
    /// Encodes string values as a categorical column.
    #[must_use]
    pub fn encode_categorical<S>(values: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let mut levels = Vec::<String>::new();
        let codes = values
            .iter()
            .map(|value| {
                let value = value.as_ref();
                levels.iter().position(|l| l == value).unwrap_or_else(|| {
                    levels.push(value.to_owned());
                    levels.len() - 1
                })
            })
            .collect();
        Self::Categorical { codes, levels }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical { codes, .. } => codes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Numeric(_) => FeatureKind::Numeric,
            Self::Categorical { .. } => FeatureKind::Categorical,
        }
    }

    /// Category levels, or an empty slice for numeric columns.
    #[must_use]
    pub fn levels(&self) -> &[String] {
        match self {
            Self::Numeric(_) => &[],
            Self::Categorical { levels, .. } => levels,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub column: FeatureColumn,
}

impl Feature {
    #[must_use]
    pub fn numeric<S>(name: S, values: Vec<f64>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            column: FeatureColumn::Numeric(values),
        }
    }

    #[must_use]
    pub fn categorical<S, V>(name: S, values: &[V]) -> Self
    where
        S: Into<String>,
        V: AsRef<str>,
    {
        Self {
            name: name.into(),
            column: FeatureColumn::encode_categorical(values),
        }
    }
}

/// Predictor columns in a fixed order.
///
/// Row `i` of every column describes the same observation. The column order is
/// the order features are reported in and the tie-break order for splits.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    features: Vec<Feature>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Creates a matrix from equally long feature columns.
    ///
    /// # Errors
    ///
    /// Returns an error on length mismatches, duplicate names, or categorical codes
    /// outside their level table.
    pub fn new(features: Vec<Feature>) -> Result<Self, MatrixError> {
        let n_rows = features.first().map_or(0, |f| f.column.len());
        for (i, feature) in features.iter().enumerate() {
            if feature.column.len() != n_rows {
                return Err(MatrixError::LengthMismatch {
                    name: feature.name.clone(),
                    expected: n_rows,
                    actual: feature.column.len(),
                });
            }
            if features[..i].iter().any(|f| f.name == feature.name) {
                return Err(MatrixError::DuplicateFeature {
                    name: feature.name.clone(),
                });
            }
            if let FeatureColumn::Categorical { codes, levels } = &feature.column
                && let Some(&code) = codes.iter().find(|&&c| c >= levels.len())
            {
                return Err(MatrixError::InvalidCode {
                    name: feature.name.clone(),
                    code,
                    levels: levels.len(),
                });
            }
        }
        Ok(Self { features, n_rows })
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.features.iter().map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        self.position(name).map(|i| self.features[i].column.kind())
    }
}

/// Regression target aligned with the rows of a [`FeatureMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct TargetVector(Vec<f64>);

impl TargetVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
