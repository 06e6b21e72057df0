//! Numeric scaler
//!
//! Parameters are fitted at training time and only ever applied here.
//! A scaler covers either the whole feature vector or a named subset of it
//! (e.g. only numeric columns when categorical indicators are left raw).

use std::collections::HashSet;

use ndarray::{ArrayViewMut1, Array2};
use serde::{Deserialize, Serialize};

use super::layout::FeatureLayout;
use crate::error::ArtifactError;

/// Floor for min-max ranges
const MIN_RANGE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `(x - center) / scale`
    Robust { center: Vec<f64>, scale: Vec<f64> },
    /// `(x - min) / (max - min)`
    MinMax { min: Vec<f64>, max: Vec<f64> },
    Identity,
}

impl ScalerParams {
    fn param_len(&self) -> Option<(usize, usize)> {
        match self {
            ScalerParams::Standard { mean, scale } => Some((mean.len(), scale.len())),
            ScalerParams::Robust { center, scale } => Some((center.len(), scale.len())),
            ScalerParams::MinMax { min, max } => Some((min.len(), max.len())),
            ScalerParams::Identity => None,
        }
    }
}

/// Scaler as persisted by training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Feature names the scaler was fit on, in order. Empty = every feature.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub params: ScalerParams,
}

impl ScalerArtifact {
    pub fn identity() -> Self {
        Self { columns: vec![], params: ScalerParams::Identity }
    }
}

/// Scaler bound to a compiled layout
#[derive(Debug, Clone)]
pub struct FittedScaler {
    /// Feature positions, one per parameter
    indices: Vec<usize>,
    /// Precomputed (offset, divisor) per position
    coefficients: Vec<(f64, f64)>,
    kind: &'static str,
}

impl FittedScaler {
    pub fn identity() -> Self {
        Self { indices: vec![], coefficients: vec![], kind: "identity" }
    }

    /// Resolve scaler columns against the layout and check parameter lengths
    pub fn bind(artifact: &ScalerArtifact, layout: &FeatureLayout) -> Result<Self, ArtifactError> {
        if artifact.params == ScalerParams::Identity {
            return Ok(Self::identity());
        }

        let indices: Vec<usize> = if artifact.columns.is_empty() {
            (0..layout.width()).collect()
        } else {
            artifact
                .columns
                .iter()
                .map(|name| {
                    layout.feature_index(name).ok_or_else(|| {
                        ArtifactError::InvalidScaler(format!("scaler column '{}' is not a model feature", name))
                    })
                })
                .collect::<Result<_, _>>()?
        };

        let mut seen = HashSet::with_capacity(indices.len());
        if let Some(&dup) = indices.iter().find(|&&i| !seen.insert(i)) {
            return Err(ArtifactError::InvalidScaler(format!(
                "scaler column '{}' listed more than once",
                layout.feature_name(dup).unwrap_or("?")
            )));
        }

        if let Some((a, b)) = artifact.params.param_len() {
            if a != indices.len() || b != indices.len() {
                return Err(ArtifactError::InvalidScaler(format!(
                    "scaler has {}/{} parameters for {} columns",
                    a,
                    b,
                    indices.len()
                )));
            }
        }

        let (coefficients, kind): (Vec<(f64, f64)>, &'static str) = match &artifact.params {
            ScalerParams::Standard { mean, scale } => (
                mean.iter().zip(scale).map(|(&m, &s)| (m, if s == 0.0 { 1.0 } else { s })).collect(),
                "standard",
            ),
            ScalerParams::Robust { center, scale } => (
                center.iter().zip(scale).map(|(&c, &s)| (c, if s == 0.0 { 1.0 } else { s })).collect(),
                "robust",
            ),
            ScalerParams::MinMax { min, max } => (
                min.iter().zip(max).map(|(&lo, &hi)| (lo, (hi - lo).max(MIN_RANGE))).collect(),
                "min_max",
            ),
            ScalerParams::Identity => (vec![], "identity"),
        };

        if coefficients.iter().any(|(o, d)| !o.is_finite() || !d.is_finite()) {
            return Err(ArtifactError::InvalidScaler("non-finite scaler parameter".to_string()));
        }

        Ok(Self { indices, coefficients, kind })
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Feature positions this scaler touches
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Scale one row in place
    pub fn transform_row(&self, mut row: ArrayViewMut1<'_, f64>) {
        for (&i, &(offset, divisor)) in self.indices.iter().zip(&self.coefficients) {
            row[i] = (row[i] - offset) / divisor;
        }
    }

    pub fn transform_slice(&self, row: &mut [f64]) {
        self.transform_row(ArrayViewMut1::from(row));
    }

    /// Scale every row of a matrix in place
    pub fn transform(&self, matrix: &mut Array2<f64>) {
        for row in matrix.rows_mut() {
            self.transform_row(row);
        }
    }
}
