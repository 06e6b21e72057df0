//! Inference Engine - Predictor invocation
//!
//! The predictor is an opaque fitted function `matrix → one scalar per row`.
//! This module owns the contract around it: shape/layout checks before the
//! call, row-count check after it, latency tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;
use crate::logic::features::{FeatureLayout, FeatureMatrix};

// ============================================================================
// PREDICTOR TRAIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Output is a class index into the target label set
    Classification,
    /// Output is a continuous value
    Regression,
}

/// Trait for fitted predictors (native trees, ONNX, ...)
pub trait Predictor: Send + Sync {
    /// Input width the predictor was fit on
    fn n_features(&self) -> usize;

    fn task(&self) -> TaskKind;

    /// Number of target classes, when known
    fn n_classes(&self) -> Option<usize> {
        None
    }

    /// Short backend name for status output
    fn method(&self) -> &'static str;

    /// One output per row: class index (classification) or value (regression)
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, InferenceError>;
}

/// Input width must equal the fitted width
pub fn check_shape(expected: usize, actual: usize) -> Result<(), InferenceError> {
    if expected != actual {
        return Err(InferenceError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

// ============================================================================
// STATS
// ============================================================================

/// Per-model latency stats
#[derive(Debug, Default)]
pub struct InferenceStats {
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
    rows_scored: AtomicU64,
}

impl InferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration, rows: usize) {
        self.latency_sum_us.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.rows_scored.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }

    pub fn rows_scored(&self) -> u64 {
        self.rows_scored.load(Ordering::Relaxed)
    }

    pub fn avg_latency_ms(&self) -> f32 {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        if count > 0 {
            (sum as f32 / count as f32) / 1000.0
        } else {
            0.0
        }
    }
}

/// Engine status for the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
    pub rows_scored: u64,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// INVOCATION
// ============================================================================

/// Run a predictor on an aligned matrix.
///
/// Rejects matrices built against another layout or with the wrong width,
/// and outputs that do not have one value per row.
pub fn invoke(
    predictor: &dyn Predictor,
    layout: &FeatureLayout,
    matrix: &FeatureMatrix,
    stats: &InferenceStats,
) -> Result<Vec<f64>, InferenceError> {
    layout.validate(matrix.version, matrix.layout_hash)?;
    check_shape(predictor.n_features(), matrix.n_features())?;

    let start_time = Instant::now();
    let outputs = predictor.predict(matrix.view())?;
    let elapsed = start_time.elapsed();

    if outputs.len() != matrix.n_rows() {
        return Err(InferenceError::Runtime(format!(
            "predictor returned {} outputs for {} rows",
            outputs.len(),
            matrix.n_rows()
        )));
    }

    stats.record(elapsed, outputs.len());
    log::debug!(
        "{} inference: {} rows in {}us",
        predictor.method(),
        outputs.len(),
        elapsed.as_micros()
    );

    Ok(outputs)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{FeatureSchema, FeatureVector, SourceColumn};

    /// Sums each row
    struct SumPredictor {
        width: usize,
    }

    impl Predictor for SumPredictor {
        fn n_features(&self) -> usize {
            self.width
        }

        fn task(&self) -> TaskKind {
            TaskKind::Regression
        }

        fn method(&self) -> &'static str {
            "sum"
        }

        fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, InferenceError> {
            check_shape(self.width, features.ncols())?;
            Ok(features.rows().into_iter().map(|r| r.sum()).collect())
        }
    }

    fn layout(columns: &[&str]) -> FeatureLayout {
        FeatureLayout::compile(FeatureSchema {
            version: 1,
            columns: columns.iter().map(|c| SourceColumn::numeric(c)).collect(),
            derived: vec![],
            feature_names: vec![],
            layout_hash: None,
        })
        .unwrap()
    }

    #[test]
    fn test_invoke_tracks_stats() {
        let layout = layout(&["a", "b"]);
        let stats = InferenceStats::new();
        let matrix = FeatureMatrix::from_rows(&layout, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let out = invoke(&SumPredictor { width: 2 }, &layout, &matrix, &stats).unwrap();
        assert_eq!(out, vec![3.0, 7.0]);
        assert_eq!(stats.inference_count(), 1);
        assert_eq!(stats.rows_scored(), 2);
    }

    #[test]
    fn test_invoke_shape_mismatch() {
        let layout = layout(&["a", "b"]);
        let stats = InferenceStats::new();
        let matrix = FeatureVector::from_values(&layout, vec![1.0, 2.0]).into_matrix();

        let err = invoke(&SumPredictor { width: 3 }, &layout, &matrix, &stats).unwrap_err();
        assert!(matches!(err, InferenceError::ShapeMismatch { expected: 3, actual: 2 }));
        assert_eq!(stats.inference_count(), 0);
    }

    #[test]
    fn test_invoke_rejects_foreign_layout() {
        let ours = layout(&["a", "b"]);
        let theirs = layout(&["b", "a"]);
        let stats = InferenceStats::new();
        let matrix = FeatureMatrix::from_rows(&theirs, vec![vec![1.0, 2.0]]);

        let err = invoke(&SumPredictor { width: 2 }, &ours, &matrix, &stats).unwrap_err();
        assert!(matches!(err, InferenceError::LayoutMismatch(_)));
    }

    #[test]
    fn test_avg_latency_empty() {
        assert_eq!(InferenceStats::new().avg_latency_ms(), 0.0);
    }
}
