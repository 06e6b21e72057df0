//! Form field declarations
//!
//! Numeric inputs carry the range the input widget enforces. Values outside
//! the range are clamped, never rejected.

use serde::{Deserialize, Serialize};

use super::layout::ColumnKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Locale key for the field label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl FieldSpec {
    pub fn range(min: f64, max: f64, default: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            default: Some(default),
            ..Default::default()
        }
    }

    /// Clamp into `[min, max]`
    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(min) = self.min {
            v = v.max(min);
        }
        if let Some(max) = self.max {
            v = v.min(max);
        }
        v
    }
}

/// Field description handed to form renderers
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: String,
    pub kind: ColumnKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Allowed values for categorical fields, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}
