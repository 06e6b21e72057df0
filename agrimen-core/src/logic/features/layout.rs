//! Feature Layout - Schema compilation
//!
//! **This file controls how input columns become model features**
//!
//! ## Rules:
//! 1. The expected feature list fixes width AND order of the model input
//! 2. Every feature name must resolve to exactly one slot
//! 3. The layout hash covers version + ordered names; a pinned hash that
//!    does not match refuses to load
//!
//! ## Slot resolution (per feature name, in this order):
//! - exact numeric column      → `Slot::Numeric`
//! - exact label column        → `Slot::Label` (encoded in place)
//! - exact derived feature     → `Slot::Derived`
//! - `<OneHotColumn>_<Category>` → `Slot::Indicator` (longest column prefix wins)

use std::collections::{HashMap, HashSet};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::field::FieldSpec;
use crate::error::ArtifactError;

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Default schema version when a manifest does not state one
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    DEFAULT_SCHEMA_VERSION
}

// ============================================================================
// SCHEMA (as persisted by training)
// ============================================================================

/// How a source column is turned into features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Passed through as a number
    Numeric,
    /// Replaced in place by its index in a fitted label encoder
    Label,
    /// Expanded into `<column>_<category>` indicator features
    OneHot,
}

/// A named input column (form field / upload header)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldSpec>,
}

impl SourceColumn {
    pub fn numeric(name: &str) -> Self {
        Self { name: name.to_string(), kind: ColumnKind::Numeric, field: None }
    }

    pub fn label(name: &str) -> Self {
        Self { name: name.to_string(), kind: ColumnKind::Label, field: None }
    }

    pub fn one_hot(name: &str) -> Self {
        Self { name: name.to_string(), kind: ColumnKind::OneHot, field: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedOp {
    /// Product of all inputs
    Product,
}

/// Feature computed from numeric source columns before scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedFeature {
    pub name: String,
    pub op: DerivedOp,
    pub inputs: Vec<String>,
}

/// Feature schema as written by the training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    #[serde(default = "default_schema_version")]
    pub version: u32,
    /// Source columns in input order
    pub columns: Vec<SourceColumn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedFeature>,
    /// Expanded feature names in the exact order the model was fit on.
    /// Empty means "source columns then derived features", which only works
    /// for schemas without one-hot columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_names: Vec<String>,
    /// Optional pinned layout hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_hash: Option<u32>,
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of a feature layout
/// Used to detect training/serving layout mismatches
pub fn compute_layout_hash(version: u32, feature_names: &[String]) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&version.to_le_bytes());

    for name in feature_names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a feature layout doesn't match the expected one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u32,
    pub expected_hash: u32,
    pub actual_version: u32,
    pub actual_hash: u32,
}

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u32,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

// ============================================================================
// COMPILED LAYOUT
// ============================================================================

/// Where one model feature takes its value from
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Numeric { column: usize },
    Label { column: usize },
    Indicator { column: usize, category: String },
    Derived { index: usize },
}

/// Schema compiled into per-feature slots
#[derive(Debug, Clone)]
pub struct FeatureLayout {
    schema: FeatureSchema,
    feature_names: Vec<String>,
    slots: Vec<Slot>,
    /// One-hot column index → categories in feature order
    vocabularies: HashMap<usize, Vec<String>>,
    hash: u32,
}

impl FeatureLayout {
    /// Compile a schema, rejecting anything that would not map 1:1 onto the model input
    pub fn compile(schema: FeatureSchema) -> Result<Self, ArtifactError> {
        if schema.columns.is_empty() {
            return Err(ArtifactError::InvalidSchema("schema has no columns".to_string()));
        }

        let mut column_index: HashMap<&str, usize> = HashMap::new();
        for (i, column) in schema.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(ArtifactError::InvalidSchema(format!("column {} has an empty name", i)));
            }
            if column_index.insert(column.name.as_str(), i).is_some() {
                return Err(ArtifactError::InvalidSchema(format!("duplicate column '{}'", column.name)));
            }
        }

        let mut derived_index: HashMap<&str, usize> = HashMap::new();
        for (i, derived) in schema.derived.iter().enumerate() {
            if column_index.contains_key(derived.name.as_str()) {
                return Err(ArtifactError::InvalidSchema(format!(
                    "derived feature '{}' shadows a source column",
                    derived.name
                )));
            }
            if derived_index.insert(derived.name.as_str(), i).is_some() {
                return Err(ArtifactError::InvalidSchema(format!("duplicate derived feature '{}'", derived.name)));
            }
            if derived.inputs.is_empty() {
                return Err(ArtifactError::InvalidSchema(format!("derived feature '{}' has no inputs", derived.name)));
            }
            for input in &derived.inputs {
                let numeric = column_index
                    .get(input.as_str())
                    .map(|&c| schema.columns[c].kind == ColumnKind::Numeric)
                    .unwrap_or(false);
                if !numeric {
                    return Err(ArtifactError::InvalidSchema(format!(
                        "derived feature '{}' input '{}' is not a numeric column",
                        derived.name, input
                    )));
                }
            }
        }

        let feature_names = if schema.feature_names.is_empty() {
            if schema.columns.iter().any(|c| c.kind == ColumnKind::OneHot) {
                return Err(ArtifactError::InvalidSchema(
                    "one-hot columns require an explicit feature_names list".to_string(),
                ));
            }
            schema.columns.iter().map(|c| c.name.clone())
                .chain(schema.derived.iter().map(|d| d.name.clone()))
                .collect()
        } else {
            schema.feature_names.clone()
        };

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(feature_names.len());
        let mut vocabularies: HashMap<usize, Vec<String>> = HashMap::new();

        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::InvalidSchema(format!("duplicate feature '{}'", name)));
            }

            let slot = if let Some(&c) = column_index.get(name.as_str()) {
                match schema.columns[c].kind {
                    ColumnKind::Numeric => Slot::Numeric { column: c },
                    ColumnKind::Label => Slot::Label { column: c },
                    ColumnKind::OneHot => {
                        return Err(ArtifactError::InvalidSchema(format!(
                            "one-hot column '{}' cannot be used as a feature directly",
                            name
                        )));
                    }
                }
            } else if let Some(&d) = derived_index.get(name.as_str()) {
                Slot::Derived { index: d }
            } else if let Some((c, category)) = match_indicator(&schema.columns, name) {
                vocabularies.entry(c).or_default().push(category.clone());
                Slot::Indicator { column: c, category }
            } else {
                return Err(ArtifactError::InvalidSchema(format!(
                    "feature '{}' does not map to any source column",
                    name
                )));
            };
            slots.push(slot);
        }

        for (i, column) in schema.columns.iter().enumerate() {
            if column.kind == ColumnKind::OneHot && !vocabularies.contains_key(&i) {
                return Err(ArtifactError::InvalidSchema(format!(
                    "one-hot column '{}' has no indicator features",
                    column.name
                )));
            }
        }

        let hash = compute_layout_hash(schema.version, &feature_names);
        if let Some(pinned) = schema.layout_hash {
            if pinned != hash {
                return Err(LayoutMismatchError {
                    expected_version: schema.version,
                    expected_hash: pinned,
                    actual_version: schema.version,
                    actual_hash: hash,
                }
                .into());
            }
        }

        Ok(Self { schema, feature_names, slots, vocabularies, hash })
    }

    /// Number of model features
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn version(&self) -> u32 {
        self.schema.version
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[SourceColumn] {
        &self.schema.columns
    }

    pub fn derived(&self) -> &[DerivedFeature] {
        &self.schema.derived
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Get feature index by name
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Get feature name by index
    pub fn feature_name(&self, index: usize) -> Option<&str> {
        self.feature_names.get(index).map(String::as_str)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.columns.iter().position(|c| c.name == name)
    }

    /// Categories of a one-hot column, in feature order
    pub fn vocabulary(&self, column: usize) -> Option<&[String]> {
        self.vocabularies.get(&column).map(Vec::as_slice)
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            version: self.schema.version,
            hash: self.hash,
            feature_count: self.width(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Validate that incoming data was produced against this layout
    pub fn validate(&self, version: u32, hash: u32) -> Result<(), LayoutMismatchError> {
        if version != self.schema.version || hash != self.hash {
            return Err(LayoutMismatchError {
                expected_version: self.schema.version,
                expected_hash: self.hash,
                actual_version: version,
                actual_hash: hash,
            });
        }
        Ok(())
    }
}

/// Resolve `<column>_<category>` against one-hot columns, longest column name first
fn match_indicator(columns: &[SourceColumn], feature: &str) -> Option<(usize, String)> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ColumnKind::OneHot)
        .filter_map(|(i, c)| {
            feature
                .strip_prefix(c.name.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|category| !category.is_empty())
                .map(|category| (i, c.name.len(), category.to_string()))
        })
        .max_by_key(|(_, len, _)| *len)
        .map(|(i, _, category)| (i, category))
}

// ============================================================================
// TESTS
// ============================================================================
