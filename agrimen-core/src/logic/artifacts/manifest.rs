//! Model manifest (`manifest.json`)
//!
//! Names every artifact a model needs. Paths are relative to the model directory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{MANIFEST_FORMAT_VERSION, MAX_PRECISION};
use crate::error::ArtifactError;
use crate::logic::features::{FeatureSchema, UnknownCategoryPolicy};
use crate::logic::format::{LabelDetails, OutputSpec};
use crate::logic::model::TaskKind;

fn default_format_version() -> u32 {
    MANIFEST_FORMAT_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// JSON tree ensemble, evaluated natively
    TreeEnsemble,
    /// ONNX graph (needs the `onnx` feature)
    Onnx,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::TreeEnsemble => "tree_ensemble",
            ModelFormat::Onnx => "onnx",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub format: ModelFormat,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Unique model name, used in URLs
    pub name: String,
    /// Locale key of the display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_key: Option<String>,
    pub task: TaskKind,
    pub schema: FeatureSchema,
    pub model: ModelRef,
    /// Fitted scaler file; absent means no scaling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<String>,
    /// Label-encoded column → encoder file
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub encoders: BTreeMap<String, String>,
    /// Encoder for the predicted class (classification)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_encoder: Option<String>,
    /// Model-specific locale catalog, merged over the built-in strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locales: Option<String>,
    pub output: OutputSpec,
    #[serde(default)]
    pub unknown_category: UnknownCategoryPolicy,
    /// Class label → extra facts
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, LabelDetails>,
    /// Relative path → SHA-256 hex
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
}

impl Manifest {
    pub fn from_json(name: &str, bytes: &[u8]) -> Result<Self, ArtifactError> {
        let manifest: Manifest = serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
            name: name.to_string(),
            source,
        })?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Checks that need no other artifact
    pub fn check(&self) -> Result<(), ArtifactError> {
        if self.format_version != MANIFEST_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.format_version,
                supported: MANIFEST_FORMAT_VERSION,
            });
        }
        if self.name.trim().is_empty() {
            return Err(ArtifactError::InvalidSchema("manifest has an empty model name".to_string()));
        }
        if self.output.precision > MAX_PRECISION {
            return Err(ArtifactError::InvalidSchema(format!(
                "output precision {} exceeds the maximum of {}",
                self.output.precision, MAX_PRECISION
            )));
        }
        if self.task == TaskKind::Classification && self.target_encoder.is_none() {
            return Err(ArtifactError::InvalidEncoder(format!(
                "classification model '{}' declares no target_encoder",
                self.name
            )));
        }
        Ok(())
    }

    /// Every file the manifest references, in load order
    pub fn referenced_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.encoders.values().map(String::as_str).collect();
        files.extend(self.scaler.as_deref());
        files.extend(self.target_encoder.as_deref());
        files.push(&self.model.path);
        files.extend(self.locales.as_deref());
        files
    }
}
