//! Model Module - Predictor invocation
//!
//! Predictors are opaque fitted functions behind the [`Predictor`] trait.
//! The native tree ensemble is always available; ONNX needs the `onnx` feature.

pub mod forest;
pub mod inference;
#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export common types
pub use forest::{Aggregation, SplitRule, TreeEnsemble, TreeSchema};
pub use inference::{check_shape, invoke, InferenceStats, ModelStatus, Predictor, TaskKind};
#[cfg(feature = "onnx")]
pub use onnx::OnnxPredictor;
