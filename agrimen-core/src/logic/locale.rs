//! Locale Catalog
//!
//! `{locale: {key: text}}`, loaded once and never mutated.
//!
//! ## Rules:
//! 1. Every locale carries exactly the same key set as the default locale
//! 2. An unknown locale falls back to the default locale
//! 3. Class labels translate through `label.<lowercased class>`

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_LOCALE;
use crate::error::ArtifactError;

pub type LocaleTable = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    #[error("locale catalog is empty")]
    Empty,

    #[error("default locale '{0}' missing from catalog")]
    MissingDefault(String),

    #[error("locale '{locale}' keys differ from '{reference}' (missing: {missing:?}, extra: {extra:?})")]
    KeyMismatch {
        locale: String,
        reference: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleCatalog {
    default_locale: String,
    tables: BTreeMap<String, LocaleTable>,
}

impl LocaleCatalog {
    pub fn new(default_locale: &str, tables: BTreeMap<String, LocaleTable>) -> Result<Self, LocaleError> {
        let catalog = Self { default_locale: default_locale.to_string(), tables };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a `{locale: {key: text}}` file
    pub fn from_json(name: &str, bytes: &[u8], default_locale: &str) -> Result<Self, ArtifactError> {
        let tables: BTreeMap<String, LocaleTable> = serde_json::from_slice(bytes).map_err(|source| {
            ArtifactError::Parse { name: name.to_string(), source }
        })?;
        Ok(Self::new(default_locale, tables)?)
    }

    /// Shared UI strings
    pub fn builtin() -> &'static LocaleCatalog {
        &BUILTIN
    }

    fn validate(&self) -> Result<(), LocaleError> {
        if self.tables.is_empty() {
            return Err(LocaleError::Empty);
        }
        let reference = self
            .tables
            .get(&self.default_locale)
            .ok_or_else(|| LocaleError::MissingDefault(self.default_locale.clone()))?;
        let reference_keys: BTreeSet<&String> = reference.keys().collect();

        for (locale, table) in &self.tables {
            let keys: BTreeSet<&String> = table.keys().collect();
            if keys != reference_keys {
                return Err(LocaleError::KeyMismatch {
                    locale: locale.clone(),
                    reference: self.default_locale.clone(),
                    missing: reference_keys.difference(&keys).map(|k| k.to_string()).collect(),
                    extra: keys.difference(&reference_keys).map(|k| k.to_string()).collect(),
                });
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`.
    /// Per locale, later wins: self default, other default, self locale, other locale.
    pub fn merge(&self, other: &LocaleCatalog) -> Result<Self, LocaleError> {
        let locales: BTreeSet<&String> = self.tables.keys().chain(other.tables.keys()).collect();

        let tables = locales
            .into_iter()
            .map(|locale| {
                let layers = [
                    self.tables.get(&self.default_locale),
                    other.tables.get(&other.default_locale),
                    self.tables.get(locale),
                    other.tables.get(locale),
                ];
                let mut table = LocaleTable::new();
                for layer in layers.into_iter().flatten() {
                    table.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                (locale.clone(), table)
            })
            .collect();

        Self::new(&self.default_locale, tables)
    }

    fn table_or_default(&self, locale: &str) -> &LocaleTable {
        self.tables
            .get(locale)
            .or_else(|| self.tables.get(&self.default_locale))
            .unwrap_or(&EMPTY_TABLE)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.tables.contains_key(locale)
    }

    /// Requested locale if known, otherwise the default
    pub fn resolve<'a>(&'a self, locale: &'a str) -> &'a str {
        if self.contains(locale) {
            locale
        } else {
            &self.default_locale
        }
    }

    pub fn table(&self, locale: &str) -> &LocaleTable {
        self.table_or_default(locale)
    }

    pub fn get(&self, locale: &str, key: &str) -> Option<&str> {
        self.table_or_default(locale).get(key).map(String::as_str)
    }

    /// Text for `key`, or the key itself
    pub fn text(&self, locale: &str, key: &str) -> String {
        self.get(locale, key).unwrap_or(key).to_string()
    }

    /// Translated class label, or the label itself
    pub fn label(&self, locale: &str, class: &str) -> String {
        self.get(locale, &label_key(class)).unwrap_or(class).to_string()
    }
}

pub fn label_key(class: &str) -> String {
    format!("label.{}", class.trim().to_lowercase())
}

static EMPTY_TABLE: Lazy<LocaleTable> = Lazy::new(BTreeMap::new);

// ============================================================================
// BUILT-IN STRINGS
// ============================================================================

const BUILTIN_STRINGS: &[(&str, &str, &str)] = &[
    // (key, en, hi)
    ("app.title", "AGRIMEN - Smart Crop Advisory", "AGRIMEN - स्मार्ट फसल सलाह"),
    ("app.welcome", "Predict the best crop, expected yield and market price.", "सर्वोत्तम फसल, अपेक्षित उपज और बाजार मूल्य का अनुमान लगाएं।"),
    ("form.predict", "Predict", "भविष्यवाणी करें"),
    ("form.manual_input", "Manual input", "मैन्युअल इनपुट"),
    ("batch.title", "Bulk prediction (CSV upload)", "बल्क भविष्यवाणी (CSV अपलोड)"),
    ("batch.required_columns", "Upload a file with columns", "इन कॉलम वाली फ़ाइल अपलोड करें"),
    ("batch.download", "Download as CSV", "CSV के रूप में डाउनलोड करें"),
    ("result.title", "Prediction", "भविष्यवाणी"),
    ("details.sowing", "Sowing", "बुआई"),
    ("details.harvest", "Harvest", "कटाई"),
    ("details.duration", "Duration", "अवधि"),
    ("unit.tonnes_per_hectare", "tonnes/hectare", "टन/हेक्टेयर"),
    ("unit.rupees_per_quintal", "₹/quintal", "₹/क्विंटल"),
    ("label.rice", "Rice", "चावल"),
    ("label.wheat", "Wheat", "गेहूँ"),
    ("label.maize", "Maize", "मक्का"),
    ("label.cotton", "Cotton", "कपास"),
    ("label.sugarcane", "Sugarcane", "गन्ना"),
];

static BUILTIN: Lazy<LocaleCatalog> = Lazy::new(|| {
    let mut tables: BTreeMap<String, LocaleTable> = BTreeMap::new();
    for &(key, en, hi) in BUILTIN_STRINGS {
        tables.entry("en".to_string()).or_default().insert(key.to_string(), en.to_string());
        tables.entry("hi".to_string()).or_default().insert(key.to_string(), hi.to_string());
    }
    LocaleCatalog { default_locale: DEFAULT_LOCALE.to_string(), tables }
});

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> LocaleTable {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_builtin_is_consistent() {
        let builtin = LocaleCatalog::builtin();
        builtin.validate().unwrap();
        assert_eq!(builtin.locales(), vec!["en", "hi"]);
        assert_eq!(builtin.label("hi", "Rice"), "चावल");
    }

    #[test]
    fn test_key_mismatch_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert("en".to_string(), table(&[("a", "A"), ("b", "B")]));
        tables.insert("hi".to_string(), table(&[("a", "ए"), ("c", "सी")]));
        let err = LocaleCatalog::new("en", tables).unwrap_err();
        assert_eq!(
            err,
            LocaleError::KeyMismatch {
                locale: "hi".to_string(),
                reference: "en".to_string(),
                missing: vec!["b".to_string()],
                extra: vec!["c".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_default_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert("hi".to_string(), table(&[("a", "ए")]));
        assert_eq!(LocaleCatalog::new("en", tables).unwrap_err(), LocaleError::MissingDefault("en".to_string()));
        assert_eq!(LocaleCatalog::new("en", BTreeMap::new()).unwrap_err(), LocaleError::Empty);
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        let builtin = LocaleCatalog::builtin();
        assert_eq!(builtin.text("fr", "details.sowing"), "Sowing");
        assert_eq!(builtin.resolve("fr"), "en");
        assert_eq!(builtin.resolve("hi"), "hi");
        // unknown key falls back to the key
        assert_eq!(builtin.text("en", "nope"), "nope");
        assert_eq!(builtin.label("en", "Barley"), "Barley");
    }

    #[test]
    fn test_merge_overlays_and_fills_locales() {
        let model = LocaleCatalog::from_json(
            "locales.json",
            r#"{"en": {"model.title": "Crop Yield", "label.rice": "Paddy"}, "or": {"model.title": "ଫସଲ ଅମଳ", "label.rice": "ଧାନ"}}"#.as_bytes(),
            "en",
        )
        .unwrap();

        let merged = LocaleCatalog::builtin().merge(&model).unwrap();
        assert_eq!(merged.locales(), vec!["en", "hi", "or"]);
        assert_eq!(merged.label("en", "rice"), "Paddy");
        // hi has no model strings: model default fills only the new keys
        assert_eq!(merged.text("hi", "model.title"), "Crop Yield");
        assert_eq!(merged.label("hi", "Rice"), "चावल");
        // or has no built-in strings: takes the built-in default
        assert_eq!(merged.text("or", "details.harvest"), "Harvest");
        assert_eq!(merged.label("or", "RICE"), "ଧାନ");
    }

    #[test]
    fn test_from_json_parse_error() {
        let err = LocaleCatalog::from_json("locales.json", b"[1, 2]", "en").unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }
}
