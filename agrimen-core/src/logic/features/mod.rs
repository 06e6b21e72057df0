//! Features Module - Feature Alignment Engine
//!
//! Maps named input fields onto the fixed-order vector a fitted model expects.
//! The schema is compiled once into a slot layout; every request reuses it.

pub mod aligner;
pub mod encoder;
pub mod field;
pub mod layout;
pub mod record;
pub mod scaler;
pub mod vector;

#[cfg(test)]
mod tests;

// Re-export common types
pub use aligner::FeatureAligner;
pub use encoder::{LabelEncoder, UnknownCategoryPolicy};
pub use field::{FieldSpec, FormField};
pub use layout::{ColumnKind, DerivedFeature, DerivedOp, FeatureLayout, FeatureSchema, LayoutInfo, SourceColumn};
pub use record::{FieldLookup, FieldValue, InputRecord, RawValue};
pub use scaler::{FittedScaler, ScalerArtifact, ScalerParams};
pub use vector::{FeatureMatrix, FeatureVector};
