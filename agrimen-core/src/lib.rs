//! AGRIMEN Core - Feature Alignment & Inference Engine
//!
//! Turns loosely-typed inputs (form fields, uploaded tables) into the exact
//! numeric layout a fitted tabular model expects, runs the model and formats
//! the result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────┐   ┌────────────┐   ┌──────────────┐
//! │  Artifacts   │──▶│ Feature Aligner │──▶│ Predictor  │──▶│  Formatter   │
//! │ (manifest)   │   │ encoders/scaler │   │ trees/onnx │   │ label / unit │
//! └──────────────┘   └─────────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! Everything is loaded once into a [`ServingContext`] and never mutated.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{AlignError, ArtifactError, InferenceError, ServingError, ServingResult};
pub use logic::batch::{score_table, BatchOutcome, BatchPolicy, Table};
pub use logic::context::{ModelBundle, ModelSummary, ServingContext};
pub use logic::format::Prediction;
pub use logic::features::{FieldValue, InputRecord, RawValue, UnknownCategoryPolicy};
pub use logic::locale::LocaleCatalog;
