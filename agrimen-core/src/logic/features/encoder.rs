//! Categorical encoders
//!
//! A label encoder maps each category to its position in the fitted class
//! list. Unknown categories are rejected; the encoder never guesses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AlignError, ArtifactError};

/// What a one-hot group does with a category it was not fit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// All-zero indicator group, alignment succeeds
    #[default]
    Ignore,
    /// Fail with `UnknownCategory`, same as label-encoded columns
    Reject,
}

/// Persisted form: `{"classes": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoderFile {
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LabelEncoderFile", into = "LabelEncoderFile")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl TryFrom<LabelEncoderFile> for LabelEncoder {
    type Error = ArtifactError;

    fn try_from(file: LabelEncoderFile) -> Result<Self, Self::Error> {
        LabelEncoder::new(file.classes)
    }
}

impl From<LabelEncoder> for LabelEncoderFile {
    fn from(encoder: LabelEncoder) -> Self {
        Self { classes: encoder.classes }
    }
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::InvalidEncoder("encoder has no classes".to_string()));
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), i).is_some() {
                return Err(ArtifactError::InvalidEncoder(format!("duplicate class '{}'", class)));
            }
        }

        Ok(Self { classes, index })
    }

    pub fn from_strs(classes: &[&str]) -> Result<Self, ArtifactError> {
        Self::new(classes.iter().map(|s| s.to_string()).collect())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    /// Category → integer code
    pub fn encode(&self, column: &str, value: &str) -> Result<usize, AlignError> {
        self.index.get(value).copied().ok_or_else(|| AlignError::UnknownCategory {
            column: column.to_string(),
            value: value.to_string(),
        })
    }

    /// Integer code → category
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known() {
        let enc = LabelEncoder::from_strs(&["Kharif", "Rabi", "Whole Year"]).unwrap();
        assert_eq!(enc.encode("Season", "Kharif").unwrap(), 0);
        assert_eq!(enc.encode("Season", "Whole Year").unwrap(), 2);
        assert_eq!(enc.decode(1), Some("Rabi"));
        assert_eq!(enc.decode(3), None);
    }

    #[test]
    fn test_encode_unknown_is_error() {
        let enc = LabelEncoder::from_strs(&["Kharif", "Rabi"]).unwrap();
        let err = enc.encode("Season", "Summer").unwrap_err();
        assert_eq!(
            err,
            AlignError::UnknownCategory { column: "Season".to_string(), value: "Summer".to_string() }
        );
    }

    #[test]
    fn test_encode_is_exact_match() {
        let enc = LabelEncoder::from_strs(&["Rice"]).unwrap();
        assert!(enc.encode("Crop", "rice").is_err());
        assert!(enc.encode("Crop", " Rice").is_err());
    }

    #[test]
    fn test_duplicate_classes_rejected() {
        assert!(LabelEncoder::from_strs(&["Rice", "Rice"]).is_err());
        assert!(LabelEncoder::new(vec![]).is_err());
    }

    #[test]
    fn test_deserialize() {
        let enc: LabelEncoder = serde_json::from_str(r#"{"classes": ["Assam", "Odisha"]}"#).unwrap();
        assert_eq!(enc.len(), 2);
        assert_eq!(enc.encode("State", "Odisha").unwrap(), 1);

        let dup = serde_json::from_str::<LabelEncoder>(r#"{"classes": ["A", "A"]}"#);
        assert!(dup.is_err());
    }

    #[test]
    fn test_policy_default_is_ignore() {
        assert_eq!(UnknownCategoryPolicy::default(), UnknownCategoryPolicy::Ignore);
        let p: UnknownCategoryPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(p, UnknownCategoryPolicy::Reject);
    }
}
