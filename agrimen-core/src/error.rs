//! Error handling
//!
//! One enum per failure class so callers can tell them apart:
//! - [`ArtifactError`] - artifacts missing or inconsistent, fatal at startup
//! - [`AlignError`] - an input record/table does not fit the schema, fatal per request
//! - [`InferenceError`] - predictor invocation failed, fatal per request/row

use std::path::PathBuf;

use thiserror::Error;

use crate::logic::features::layout::LayoutMismatchError;
use crate::logic::locale::LocaleError;

pub type ServingResult<T> = Result<T, ServingError>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact path '{0}' escapes the model directory")]
    UnsafePath(String),

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("unsupported manifest format v{found} (supported: v{supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("unsupported model format '{0}'")]
    UnsupportedFormat(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid encoder: {0}")]
    InvalidEncoder(String),

    #[error("invalid scaler: {0}")]
    InvalidScaler(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("duplicate model name '{0}'")]
    DuplicateModel(String),

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error(transparent)]
    Locale(#[from] LocaleError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("invalid numeric value '{value}' for column '{column}'")]
    InvalidNumber { column: String, value: String },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<AlignError>,
    },
}

impl AlignError {
    /// Strip row wrapping to get at the underlying condition
    pub fn root(&self) -> &AlignError {
        match self {
            AlignError::Row { source, .. } => source.root(),
            other => other,
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("shape mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("class index {index} outside the fitted label set ({classes} classes)")]
    UnknownClass { index: String, classes: usize },

    #[error("inference runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum ServingError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("failed to read table: {0}")]
    Table(#[from] csv::Error),
}
