//! Feature Vector - Core data structure for model input
//!
//! **Versioned vectors with layout validation**
//!
//! Every aligned vector/matrix carries the version and hash of the layout it
//! was produced against, so the predictor side can refuse a vector built for
//! a different model.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::layout::FeatureLayout;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u32,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in layout order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Create a zeroed vector for a layout
    pub fn zeros(layout: &FeatureLayout) -> Self {
        Self::from_values(layout, vec![0.0; layout.width()])
    }

    pub fn from_values(layout: &FeatureLayout, values: Vec<f64>) -> Self {
        Self {
            version: layout.version(),
            layout_hash: layout.hash(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.values[..])
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, layout: &FeatureLayout, name: &str) -> Option<f64> {
        layout.feature_index(name).and_then(|i| self.get(i))
    }

    /// Single-row matrix for the predictor
    pub fn into_matrix(self) -> FeatureMatrix {
        let width = self.values.len();
        FeatureMatrix {
            version: self.version,
            layout_hash: self.layout_hash,
            // shape always matches the data length
            values: Array2::from_shape_vec((1, width), self.values)
                .unwrap_or_else(|_| Array2::zeros((0, width))),
        }
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self, layout: &FeatureLayout) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": layout.feature_names().iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.clone(), *value))
                .collect::<HashMap<_, _>>(),
        })
    }
}

// ============================================================================
// FEATURE MATRIX (batch)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub version: u32,
    pub layout_hash: u32,
    /// rows × features
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    /// Stack aligned rows; every row must have the layout width
    pub fn from_rows(layout: &FeatureLayout, rows: Vec<Vec<f64>>) -> Self {
        let width = layout.width();
        let n_rows = rows.len();
        let mut values = Array2::zeros((n_rows, width));
        for (mut target, row) in values.rows_mut().into_iter().zip(rows) {
            for (t, v) in target.iter_mut().zip(row) {
                *t = v;
            }
        }
        Self {
            version: layout.version(),
            layout_hash: layout.hash(),
            values,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_rows()).then(|| self.values.row(index))
    }
}

// ============================================================================
// TESTS
// ============================================================================
