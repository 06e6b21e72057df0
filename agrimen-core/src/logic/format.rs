//! Result Formatter
//!
//! Attaches presentation semantics to a raw predictor output:
//! - classification: index → class label → translated label (+ label details)
//! - regression: rounded value + translated unit
//!
//! A class index outside the fitted label set is an error, never a made-up label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PRECISION;
use crate::error::{ArtifactError, InferenceError};
use crate::logic::features::LabelEncoder;
use crate::logic::locale::LocaleCatalog;
use crate::logic::model::TaskKind;

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

fn default_true() -> bool {
    true
}

/// Output declaration from the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Column appended to batch output, e.g. `Predicted Crop`
    pub column: String,
    /// Locale key of the unit shown after regression values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_key: Option<String>,
    #[serde(default = "default_precision")]
    pub precision: usize,
    /// Translate class labels (also in batch output)
    #[serde(default = "default_true")]
    pub translate_labels: bool,
}

impl OutputSpec {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            unit_key: None,
            precision: DEFAULT_PRECISION,
            translate_labels: true,
        }
    }
}

/// Per-label extra facts (`key → value`), e.g. sowing/harvest window
pub type LabelDetails = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub key: String,
    /// Translated through `details.<key>`
    pub label: String,
    pub value: String,
}

/// Formatted single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model: String,
    pub task: TaskKind,
    pub locale: String,
    /// Raw predictor output
    pub value: f64,
    /// Class label (classification only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// What a user sees
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Detail>,
}

#[derive(Debug, Clone)]
pub struct ResultFormatter {
    model: String,
    task: TaskKind,
    target: Option<LabelEncoder>,
    output: OutputSpec,
    details: BTreeMap<String, LabelDetails>,
}

impl ResultFormatter {
    pub fn new(
        model: &str,
        task: TaskKind,
        target: Option<LabelEncoder>,
        output: OutputSpec,
        details: BTreeMap<String, LabelDetails>,
    ) -> Result<Self, ArtifactError> {
        if task == TaskKind::Classification && target.is_none() {
            return Err(ArtifactError::InvalidEncoder(format!(
                "classification model '{}' has no target encoder",
                model
            )));
        }
        if output.column.trim().is_empty() {
            return Err(ArtifactError::InvalidSchema("output column name is empty".to_string()));
        }
        if let Some(target) = &target {
            for label in details.keys().filter(|l| !target.contains(l)) {
                log::warn!("Details for '{}' do not match any class of '{}'", label, model);
            }
        }

        Ok(Self { model: model.to_string(), task, target, output, details })
    }

    pub fn output(&self) -> &OutputSpec {
        &self.output
    }

    pub fn classes(&self) -> Option<&[String]> {
        self.target.as_ref().map(LabelEncoder::classes)
    }

    /// Class index → class label
    pub fn decode(&self, value: f64) -> Result<&str, InferenceError> {
        let classes = self.target.as_ref().map(LabelEncoder::len).unwrap_or(0);
        let unknown = || InferenceError::UnknownClass { index: value.to_string(), classes };

        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(unknown());
        }
        self.target
            .as_ref()
            .and_then(|t| t.decode(value as usize))
            .ok_or_else(unknown)
    }

    fn display_label(&self, label: &str, catalog: &LocaleCatalog, locale: &str) -> String {
        if self.output.translate_labels {
            catalog.label(locale, label)
        } else {
            label.to_string()
        }
    }

    fn round(&self, value: f64) -> String {
        format!("{:.*}", self.output.precision, value)
    }

    /// Rounded value followed by the translated unit, if any
    fn display_value(&self, value: f64, catalog: &LocaleCatalog, locale: &str) -> (String, Option<String>) {
        let unit = self.output.unit_key.as_deref().map(|key| catalog.text(locale, key));
        let display = match &unit {
            Some(unit) => format!("{} {}", self.round(value), unit),
            None => self.round(value),
        };
        (display, unit)
    }

    pub fn format(&self, value: f64, catalog: &LocaleCatalog, locale: &str) -> Result<Prediction, InferenceError> {
        let locale = catalog.resolve(locale).to_string();

        let (label, display, unit, details) = match self.task {
            TaskKind::Classification => {
                let label = self.decode(value)?;
                let details: Vec<Detail> = self
                    .details
                    .get(label)
                    .map(|entries| {
                        entries
                            .iter()
                            .map(|(key, v)| Detail {
                                key: key.clone(),
                                label: catalog.text(&locale, &format!("details.{}", key)),
                                value: v.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (Some(label.to_string()), self.display_label(label, catalog, &locale), None, details)
            }
            TaskKind::Regression => {
                if !value.is_finite() {
                    return Err(InferenceError::Runtime(format!("non-finite prediction {}", value)));
                }
                let (display, unit) = self.display_value(value, catalog, &locale);
                (None, display, unit, vec![])
            }
        };

        Ok(Prediction {
            model: self.model.clone(),
            task: self.task,
            locale,
            value,
            label,
            display,
            unit,
            details,
        })
    }

    /// Cell text for the appended batch column
    pub fn cell(&self, value: f64, catalog: &LocaleCatalog, locale: &str) -> Result<String, InferenceError> {
        match self.task {
            TaskKind::Classification => {
                let label = self.decode(value)?;
                Ok(self.display_label(label, catalog, catalog.resolve(locale)))
            }
            TaskKind::Regression if value.is_finite() => Ok(self.display_value(value, catalog, catalog.resolve(locale)).0),
            TaskKind::Regression => Err(InferenceError::Runtime(format!("non-finite prediction {}", value))),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
