//! Input records
//!
//! A record is a loosely-typed `column → value` map. Form posts give strings,
//! JSON bodies give numbers or strings, uploaded tables give strings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// Owned input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl RawValue {
    pub fn as_field(&self) -> FieldValue<'_> {
        match self {
            RawValue::Number(n) => FieldValue::Number(*n),
            RawValue::Text(s) => FieldValue::Text(s),
        }
    }
}

/// Borrowed view of a single cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl FieldValue<'_> {
    /// Parse as a finite number
    pub fn to_number(&self, column: &str) -> Result<f64, AlignError> {
        let parsed = match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        };

        parsed.filter(|v| v.is_finite()).ok_or_else(|| AlignError::InvalidNumber {
            column: column.to_string(),
            value: self.to_category(),
        })
    }

    /// Render as a category string.
    /// Integral numbers drop the fraction so `2019.0` matches the category `2019`.
    pub fn to_category(&self) -> String {
        match self {
            FieldValue::Text(s) => s.to_string(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            FieldValue::Number(n) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

/// Anything the aligner can read named cells from
pub trait FieldLookup {
    fn lookup(&self, column: &str) -> Option<FieldValue<'_>>;
}

/// Single named-field input (form submission / JSON body)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord {
    fields: HashMap<String, RawValue>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<RawValue>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut RawValue> {
        self.fields.get_mut(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<RawValue> {
        self.fields.remove(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl FieldLookup for InputRecord {
    fn lookup(&self, column: &str) -> Option<FieldValue<'_>> {
        self.fields.get(column).map(RawValue::as_field)
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parsing() {
        assert_eq!(FieldValue::Text(" 20.8 ").to_number("temperature").unwrap(), 20.8);
        assert_eq!(FieldValue::Number(90.0).to_number("N").unwrap(), 90.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = FieldValue::Text("NaN").to_number("ph").unwrap_err();
        assert!(matches!(err, AlignError::InvalidNumber { ref column, .. } if column == "ph"));
        assert!(FieldValue::Number(f64::INFINITY).to_number("ph").is_err());
        assert!(FieldValue::Text("abc").to_number("ph").is_err());
        assert!(FieldValue::Text("").to_number("ph").is_err());
    }

    #[test]
    fn test_category_rendering() {
        assert_eq!(FieldValue::Number(2019.0).to_category(), "2019");
        assert_eq!(FieldValue::Number(1.5).to_category(), "1.5");
        assert_eq!(FieldValue::Text("Rice").to_category(), "Rice");
    }

    #[test]
    fn test_record_deserialize_mixed() {
        let record: InputRecord = serde_json::from_str(r#"{"Crop": "Rice", "Area": 1000.5}"#).unwrap();
        assert_eq!(record.lookup("Crop"), Some(FieldValue::Text("Rice")));
        assert_eq!(record.lookup("Area"), Some(FieldValue::Number(1000.5)));
        assert_eq!(record.lookup("State"), None);
    }

    #[test]
    fn test_record_from_iter() {
        let record: InputRecord = vec![("N", 90.0), ("P", 42.0)].into_iter().collect();
        assert_eq!(record.len(), 2);
    }
}
