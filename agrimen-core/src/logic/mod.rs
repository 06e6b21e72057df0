//! Logic Module - Serving pipeline
//!
//! - `features/` - schema layout, encoders, scaler, aligner
//! - `model/` - predictors (tree ensemble, ONNX)
//! - `artifacts/` - manifest + on-disk artifact loading
//! - `batch/` - table scoring for uploads

pub mod artifacts;
pub mod batch;
pub mod context;
pub mod features;
pub mod format;
pub mod locale;
pub mod model;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
