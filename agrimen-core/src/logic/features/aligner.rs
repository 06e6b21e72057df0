//! Feature Aligner
//!
//! Turns a named-field record (or every row of a table) into the exact
//! fixed-order vector the predictor was fit on:
//!
//! 1. Resolve each source column (numeric parse, label encode, one-hot category)
//! 2. Fill every layout slot from the resolved columns
//! 3. Apply the fitted scaler
//!
//! Columns not in the schema are ignored. Nothing here mutates shared state.

use std::collections::HashMap;

use super::encoder::{LabelEncoder, UnknownCategoryPolicy};
use super::field::FormField;
use super::layout::{ColumnKind, DerivedOp, FeatureLayout, Slot};
use super::record::{FieldLookup, InputRecord, RawValue};
use super::scaler::FittedScaler;
use super::vector::{FeatureMatrix, FeatureVector};
use crate::error::{AlignError, ArtifactError};
use crate::logic::locale::LocaleCatalog;

/// Source column after reading it from the input
#[derive(Debug, Clone)]
enum Resolved {
    Number(f64),
    /// One-hot column given by value; `None` = category outside the vocabulary
    Category(Option<String>),
    /// One-hot column given as pre-expanded indicator columns
    Expanded,
}

/// Fitted vocabulary entry for a raw input value.
///
/// Vocabularies keep whatever padding the training data had (`"Kharif     "`),
/// so the raw value is tried first, then the trimmed value, then the single
/// entry that equals it once both sides are trimmed.
fn match_category<'a>(vocabulary: &'a [String], raw: &str) -> Option<&'a str> {
    let exact = |value: &str| vocabulary.iter().find(|c| c.as_str() == value);
    if let Some(hit) = exact(raw).or_else(|| exact(raw.trim())) {
        return Some(hit.as_str());
    }

    let trimmed = raw.trim();
    let mut padded = vocabulary.iter().filter(|c| c.trim() == trimmed);
    match (padded.next(), padded.next()) {
        (Some(hit), None) => Some(hit.as_str()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct FeatureAligner {
    layout: FeatureLayout,
    /// Keyed by source column index
    encoders: HashMap<usize, LabelEncoder>,
    scaler: FittedScaler,
    policy: UnknownCategoryPolicy,
}

impl FeatureAligner {
    /// Every label column needs exactly one encoder; extra encoders are an error
    pub fn new(
        layout: FeatureLayout,
        encoders: HashMap<String, LabelEncoder>,
        scaler: FittedScaler,
        policy: UnknownCategoryPolicy,
    ) -> Result<Self, ArtifactError> {
        let mut by_index = HashMap::with_capacity(encoders.len());
        for (name, encoder) in encoders {
            let idx = layout.column_index(&name).ok_or_else(|| {
                ArtifactError::InvalidEncoder(format!("encoder for unknown column '{}'", name))
            })?;
            if layout.columns()[idx].kind != ColumnKind::Label {
                return Err(ArtifactError::InvalidEncoder(format!(
                    "column '{}' is not label-encoded",
                    name
                )));
            }
            by_index.insert(idx, encoder);
        }

        for (idx, column) in layout.columns().iter().enumerate() {
            if column.kind == ColumnKind::Label && !by_index.contains_key(&idx) {
                return Err(ArtifactError::InvalidEncoder(format!(
                    "no encoder for label column '{}'",
                    column.name
                )));
            }
        }

        Ok(Self { layout, encoders: by_index, scaler, policy })
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.layout.column_index(column).and_then(|i| self.encoders.get(&i))
    }

    /// Source column names an input must provide, in schema order
    pub fn required_columns(&self) -> Vec<&str> {
        self.layout.columns().iter().map(|c| c.name.as_str()).collect()
    }

    // ========================================================================
    // COLUMN CHECKS
    // ========================================================================

    /// Required columns not satisfied by `present`.
    /// A one-hot group is satisfied by its source column or any of its indicators.
    fn missing_columns(&self, present: impl Fn(&str) -> bool) -> Vec<String> {
        self.layout
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, column)| {
                if present(&column.name) {
                    return false;
                }
                match column.kind {
                    ColumnKind::OneHot => !self.indicator_names(*idx).any(|name| present(name)),
                    _ => true,
                }
            })
            .map(|(_, column)| column.name.clone())
            .collect()
    }

    /// Header check for tables, run before any row is touched
    pub fn check_columns(&self, headers: &[String]) -> Result<(), AlignError> {
        let missing = self.missing_columns(|name| headers.iter().any(|h| h == name));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AlignError::MissingColumns(missing))
        }
    }

    fn indicator_names(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.layout
            .slots()
            .iter()
            .zip(self.layout.feature_names())
            .filter(move |(slot, _)| matches!(slot, Slot::Indicator { column: c, .. } if *c == column))
            .map(|(_, name)| name.as_str())
    }

    // ========================================================================
    // ALIGNMENT
    // ========================================================================

    fn resolve_column<R: FieldLookup + ?Sized>(&self, idx: usize, input: &R) -> Result<Resolved, AlignError> {
        let column = &self.layout.columns()[idx];
        let value = input.lookup(&column.name);

        match (column.kind, value) {
            (ColumnKind::Numeric, Some(v)) => Ok(Resolved::Number(v.to_number(&column.name)?)),
            (ColumnKind::Label, Some(v)) => {
                let category = v.to_category();
                let encoder = self.encoders.get(&idx).ok_or_else(|| AlignError::UnknownCategory {
                    column: column.name.clone(),
                    value: category.clone(),
                })?;
                let class = match_category(encoder.classes(), &category).unwrap_or(category.trim());
                Ok(Resolved::Number(encoder.encode(&column.name, class)? as f64))
            }
            (ColumnKind::OneHot, Some(v)) => {
                let raw = v.to_category();
                let matched = self.layout.vocabulary(idx).and_then(|vocab| match_category(vocab, &raw));

                match matched {
                    Some(category) => Ok(Resolved::Category(Some(category.to_string()))),
                    None => {
                        let category = raw.trim();
                        match self.policy {
                            UnknownCategoryPolicy::Ignore => {
                                log::debug!("Unseen category '{}' for '{}', zero indicator group", category, column.name);
                                Ok(Resolved::Category(None))
                            }
                            UnknownCategoryPolicy::Reject => Err(AlignError::UnknownCategory {
                                column: column.name.clone(),
                                value: category.to_string(),
                            }),
                        }
                    }
                }
            }
            (ColumnKind::OneHot, None) => Ok(Resolved::Expanded),
            (_, None) => Err(AlignError::MissingColumns(vec![column.name.clone()])),
        }
    }

    /// Align without scaling (derived features use raw values)
    pub fn align_unscaled<R: FieldLookup + ?Sized>(&self, input: &R) -> Result<Vec<f64>, AlignError> {
        let missing = self.missing_columns(|name| input.lookup(name).is_some());
        if !missing.is_empty() {
            return Err(AlignError::MissingColumns(missing));
        }

        let resolved = (0..self.layout.columns().len())
            .map(|idx| self.resolve_column(idx, input))
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::with_capacity(self.layout.width());
        for (slot, feature) in self.layout.slots().iter().zip(self.layout.feature_names()) {
            let value = match slot {
                Slot::Numeric { column } | Slot::Label { column } => match &resolved[*column] {
                    Resolved::Number(v) => *v,
                    _ => 0.0,
                },
                Slot::Indicator { column, category } => match &resolved[*column] {
                    Resolved::Category(Some(active)) => f64::from(u8::from(active == category)),
                    Resolved::Category(None) => 0.0,
                    Resolved::Expanded => match input.lookup(feature) {
                        Some(v) if !v.is_blank() => v.to_number(feature)?,
                        _ => 0.0,
                    },
                    Resolved::Number(_) => 0.0,
                },
                Slot::Derived { index } => self.derive(*index, &resolved),
            };
            values.push(value);
        }

        Ok(values)
    }

    fn derive(&self, index: usize, resolved: &[Resolved]) -> f64 {
        let derived = &self.layout.derived()[index];
        let inputs = derived.inputs.iter().map(|name| {
            self.layout
                .column_index(name)
                .and_then(|c| match &resolved[c] {
                    Resolved::Number(v) => Some(*v),
                    _ => None,
                })
                .unwrap_or(0.0)
        });

        match derived.op {
            DerivedOp::Product => inputs.product(),
        }
    }

    /// Align and scale a single record
    pub fn align<R: FieldLookup + ?Sized>(&self, input: &R) -> Result<FeatureVector, AlignError> {
        let mut values = self.align_unscaled(input)?;
        self.scaler.transform_slice(&mut values);
        Ok(FeatureVector::from_values(&self.layout, values))
    }

    /// Align one table row; errors carry the 1-based row number
    pub fn align_row<R: FieldLookup + ?Sized>(&self, row: usize, input: &R) -> Result<Vec<f64>, AlignError> {
        let mut values = self.align_unscaled(input).map_err(|e| AlignError::Row {
            row,
            source: Box::new(e),
        })?;
        self.scaler.transform_slice(&mut values);
        Ok(values)
    }

    /// Align every row; the first failing row aborts
    pub fn align_rows<'a, R, I>(&self, rows: I) -> Result<FeatureMatrix, AlignError>
    where
        R: FieldLookup + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let aligned = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| self.align_row(i + 1, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureMatrix::from_rows(&self.layout, aligned))
    }

    // ========================================================================
    // FORM SUPPORT
    // ========================================================================

    /// Clamp numeric form values into their declared range.
    /// Values that do not parse are left for `align` to reject.
    pub fn clamp_to_fields(&self, record: &mut InputRecord) {
        for column in self.layout.columns() {
            let Some(spec) = column.field.as_ref() else { continue };
            if column.kind != ColumnKind::Numeric {
                continue;
            }
            let Some(value) = record.get_mut(&column.name) else { continue };
            if let Ok(v) = value.as_field().to_number(&column.name) {
                let clamped = spec.clamp(v);
                if clamped != v {
                    log::debug!("Clamped '{}' from {} to {}", column.name, v, clamped);
                }
                *value = RawValue::Number(clamped);
            }
        }
    }

    /// Form field descriptions with translated labels and sorted options
    pub fn form_fields(&self, catalog: &LocaleCatalog, locale: &str) -> Vec<FormField> {
        self.layout
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let spec = column.field.clone().unwrap_or_default();
                let label = spec
                    .label_key
                    .as_deref()
                    .and_then(|key| catalog.get(locale, key))
                    .unwrap_or(column.name.as_str())
                    .to_string();

                let mut options: Vec<String> = match column.kind {
                    ColumnKind::Numeric => vec![],
                    ColumnKind::Label => self
                        .encoders
                        .get(&idx)
                        .map(|e| e.classes().to_vec())
                        .unwrap_or_default(),
                    ColumnKind::OneHot => self.layout.vocabulary(idx).map(<[String]>::to_vec).unwrap_or_default(),
                };
                options.sort();

                FormField {
                    name: column.name.clone(),
                    kind: column.kind,
                    label,
                    min: spec.min,
                    max: spec.max,
                    default: spec.default,
                    step: spec.step,
                    options,
                }
            })
            .collect()
    }
}
