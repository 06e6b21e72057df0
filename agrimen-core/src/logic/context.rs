//! Serving Context
//!
//! Every model bundle is loaded once at startup and shared read-only
//! (`Arc<ModelBundle>`) with request handlers. No global state: the context
//! is passed explicitly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifacts::{discover_model_dirs, load_model_dir, ModelFormat};
use super::features::{FeatureAligner, FeatureLayout, FeatureMatrix, FormField, InputRecord, LayoutInfo};
use super::format::{Prediction, ResultFormatter};
use super::locale::{LocaleCatalog, LocaleTable};
use super::model::{invoke, InferenceStats, ModelStatus, Predictor, TaskKind};
use crate::constants::DEFAULT_LOCALE;
use crate::error::{ArtifactError, InferenceError, ServingError, ServingResult};

// ============================================================================
// MODEL BUNDLE
// ============================================================================

/// Short model description for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub title: String,
    pub task: TaskKind,
    pub method: String,
    pub feature_count: usize,
    pub layout_hash: String,
    pub required_columns: Vec<String>,
    pub output_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
}

/// Everything needed to serve one model
pub struct ModelBundle {
    name: String,
    title_key: Option<String>,
    format: ModelFormat,
    source: String,
    aligner: FeatureAligner,
    predictor: Box<dyn Predictor>,
    formatter: ResultFormatter,
    catalog: LocaleCatalog,
    stats: InferenceStats,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("source", &self.source)
            .field("method", &self.predictor.method())
            .field("features", &self.aligner.layout().width())
            .finish()
    }
}

impl ModelBundle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        title_key: Option<String>,
        format: ModelFormat,
        source: String,
        aligner: FeatureAligner,
        predictor: Box<dyn Predictor>,
        formatter: ResultFormatter,
        catalog: LocaleCatalog,
    ) -> Self {
        Self {
            name,
            title_key,
            format,
            source,
            aligner,
            predictor,
            formatter,
            catalog,
            stats: InferenceStats::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task(&self) -> TaskKind {
        self.predictor.task()
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn layout(&self) -> &FeatureLayout {
        self.aligner.layout()
    }

    pub fn formatter(&self) -> &ResultFormatter {
        &self.formatter
    }

    pub fn catalog(&self) -> &LocaleCatalog {
        &self.catalog
    }

    pub fn output_column(&self) -> &str {
        &self.formatter.output().column
    }

    pub fn title(&self, locale: &str) -> String {
        self.title_key
            .as_deref()
            .and_then(|key| self.catalog.get(locale, key))
            .unwrap_or(&self.name)
            .to_string()
    }

    /// Form submission → formatted prediction.
    /// Numeric fields are clamped into their declared range first.
    pub fn predict_record(&self, record: &InputRecord, locale: &str) -> ServingResult<Prediction> {
        let mut record = record.clone();
        self.aligner.clamp_to_fields(&mut record);

        let vector = self.aligner.align(&record)?;
        log::debug!("[{}] aligned {}", self.name, vector.to_log_entry(self.layout()));

        let outputs = self.predict_matrix(&vector.into_matrix())?;
        let value = outputs
            .first()
            .copied()
            .ok_or_else(|| InferenceError::Runtime("predictor returned no output".to_string()))?;

        Ok(self.formatter.format(value, &self.catalog, locale)?)
    }

    /// Raw predictor outputs for an aligned matrix
    pub fn predict_matrix(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        invoke(self.predictor.as_ref(), self.layout(), matrix, &self.stats)
    }

    pub fn form_fields(&self, locale: &str) -> Vec<FormField> {
        self.aligner.form_fields(&self.catalog, locale)
    }

    pub fn layout_info(&self) -> LayoutInfo {
        self.layout().info()
    }

    pub fn summary(&self, locale: &str) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            title: self.title(locale),
            task: self.task(),
            method: self.predictor.method().to_string(),
            feature_count: self.layout().width(),
            layout_hash: format!("{:08x}", self.layout().hash()),
            required_columns: self.aligner.required_columns().into_iter().map(String::from).collect(),
            output_column: self.output_column().to_string(),
            classes: self.formatter.classes().map(<[String]>::to_vec),
        }
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            model_loaded: true,
            model_name: self.name.clone(),
            inference_device: format!("{} ({})", self.predictor.method(), self.format.as_str()),
            avg_latency_ms: self.stats.avg_latency_ms(),
            inference_count: self.stats.inference_count(),
            rows_scored: self.stats.rows_scored(),
            loaded_at: self.loaded_at,
        }
    }
}

// ============================================================================
// SERVING CONTEXT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServingContext {
    models: BTreeMap<String, Arc<ModelBundle>>,
    default_locale: String,
}

impl Default for ServingContext {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl ServingContext {
    pub fn new(default_locale: &str) -> Self {
        Self { models: BTreeMap::new(), default_locale: default_locale.to_string() }
    }

    /// Load every model directory under `root`
    pub fn load_dir(root: &Path, default_locale: &str) -> Result<Self, ArtifactError> {
        let mut context = Self::new(default_locale);
        for dir in discover_model_dirs(root)? {
            context.insert(load_model_dir(&dir)?)?;
        }
        if context.is_empty() {
            log::warn!("No models found under {}", root.display());
        } else {
            log::info!("Serving {} model(s): {}", context.len(), context.names().join(", "));
        }
        Ok(context)
    }

    pub fn insert(&mut self, bundle: ModelBundle) -> Result<(), ArtifactError> {
        if self.models.contains_key(bundle.name()) {
            return Err(ArtifactError::DuplicateModel(bundle.name().to_string()));
        }
        self.models.insert(bundle.name().to_string(), Arc::new(bundle));
        Ok(())
    }

    pub fn model(&self, name: &str) -> ServingResult<Arc<ModelBundle>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ServingError::UnknownModel(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelBundle>> {
        self.models.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Requested locale, or the configured default
    pub fn locale_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_locale)
    }

    /// Shared catalog
    pub fn catalog(&self) -> &LocaleCatalog {
        LocaleCatalog::builtin()
    }

    /// Every locale any model can answer in
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self
            .models
            .values()
            .flat_map(|m| m.catalog().locales())
            .chain(self.catalog().locales())
            .map(String::from)
            .collect();
        locales.sort();
        locales.dedup();
        locales
    }

    /// Strings for `locale` from the shared catalog and every model catalog
    /// that has it, models in name order. `None` when no catalog has it.
    pub fn locale_table(&self, locale: &str) -> Option<LocaleTable> {
        let catalogs = std::iter::once(self.catalog()).chain(self.models.values().map(|m| m.catalog()));

        let mut table: Option<LocaleTable> = None;
        for catalog in catalogs.filter(|c| c.contains(locale)) {
            table
                .get_or_insert_with(LocaleTable::new)
                .extend(catalog.table(locale).iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        table
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlignError;
    use crate::logic::fixtures::{self, CROP_RECOMMENDATION, CROP_YIELD, MARKET_PRICE, ODISHA_YIELD};

    #[test]
    fn test_recommendation_scenario() {
        let bundle = fixtures::bundle(CROP_RECOMMENDATION).unwrap();
        let prediction = bundle.predict_record(&fixtures::recommendation_record(), "en").unwrap();

        let label = prediction.label.as_deref().unwrap();
        assert!(bundle.formatter().classes().unwrap().iter().any(|c| c == label));
        assert_eq!(label, "rice");
        assert_eq!(prediction.display, "Rice");
        assert_eq!(prediction.details.len(), 3);
    }

    #[test]
    fn test_prediction_is_idempotent() {
        let bundle = fixtures::bundle(ODISHA_YIELD).unwrap();
        let record = fixtures::odisha_record();
        let first = bundle.predict_record(&record, "en").unwrap();
        let second = bundle.predict_record(&record, "en").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.display, "2.85 tonnes/hectare");
        assert_eq!(bundle.status().inference_count, 2);
    }

    #[test]
    fn test_form_values_are_clamped() {
        let bundle = fixtures::bundle(CROP_RECOMMENDATION).unwrap();
        // rainfall above the 500 mm widget limit behaves like 500
        let mut record = fixtures::recommendation_record();
        record.insert("rainfall", 9000.0);
        let clamped = bundle.predict_record(&record, "en").unwrap();
        record.insert("rainfall", 500.0);
        let at_limit = bundle.predict_record(&record, "en").unwrap();
        assert_eq!(clamped.label, at_limit.label);
    }

    #[test]
    fn test_unknown_label_category_fails_request() {
        let bundle = fixtures::bundle(CROP_YIELD).unwrap();
        let record = InputRecord::new()
            .with("Crop", "Barley")
            .with("Crop_Year", 2019.0)
            .with("Season", "Kharif")
            .with("State", "Odisha")
            .with("Area", 1000.0)
            .with("Production", 2500.0)
            .with("Annual_Rainfall", 1400.0)
            .with("Fertilizer", 80000.0)
            .with("Pesticide", 1200.0);
        let err = bundle.predict_record(&record, "en").unwrap_err();
        assert!(matches!(err, ServingError::Align(AlignError::UnknownCategory { .. })));
    }

    #[test]
    fn test_unknown_one_hot_category_is_ignored() {
        let bundle = fixtures::bundle(MARKET_PRICE).unwrap();
        let known = bundle.predict_record(&fixtures::market_record(), "en").unwrap();
        assert_eq!(known.display, "2200.00");

        let mut record = fixtures::market_record();
        record.insert("Market", "Bhubaneswar");
        let unseen = bundle.predict_record(&record, "en").unwrap();
        assert_eq!(unseen.value, known.value);
    }

    #[test]
    fn test_summary_and_title() {
        let bundle = fixtures::bundle(CROP_RECOMMENDATION).unwrap();
        let summary = bundle.summary("hi");
        assert_eq!(summary.title, "फसल सिफारिश");
        assert_eq!(summary.feature_count, 7);
        assert_eq!(summary.method, "random_forest");
        assert_eq!(summary.output_column, "Predicted Crop");
        assert_eq!(summary.classes.as_ref().map(Vec::len), Some(3));
        assert_eq!(summary.required_columns[0], "N");

        // no title key: falls back to the model name
        let other = fixtures::bundle(CROP_YIELD).unwrap();
        assert_eq!(other.title("en"), "crop_yield");
        assert_eq!(other.summary("en").method, "gradient_boosting");
    }

    #[test]
    fn test_form_fields_translated() {
        let bundle = fixtures::bundle(CROP_RECOMMENDATION).unwrap();
        let fields = bundle.form_fields("hi");
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[6].label, "वर्षा (मिमी)");
        assert_eq!(fields[6].max, Some(500.0));
    }

    #[test]
    fn test_context_lookup() {
        let context = fixtures::serving_context().unwrap();
        assert_eq!(context.len(), 4);
        assert_eq!(context.names(), vec![CROP_RECOMMENDATION, CROP_YIELD, MARKET_PRICE, ODISHA_YIELD]);
        assert!(context.model(CROP_YIELD).is_ok());
        assert!(matches!(context.model("cotton_price"), Err(ServingError::UnknownModel(_))));
        assert_eq!(context.locales(), vec!["en", "hi", "or"]);
        assert_eq!(context.locale_or_default(Some(" ")), "en");
        assert_eq!(context.locale_or_default(Some("hi")), "hi");
    }

    #[test]
    fn test_locale_table_spans_model_catalogs() {
        let context = fixtures::serving_context().unwrap();
        for locale in context.locales() {
            assert!(context.locale_table(&locale).is_some(), "{}", locale);
        }

        let or = context.locale_table("or").unwrap();
        assert_eq!(or["model.crop_recommendation"], "ଫସଲ ସୁପାରିଶ");
        // shared keys fall back to the default locale text
        assert_eq!(or["label.rice"], "Rice");

        let hi = context.locale_table("hi").unwrap();
        assert_eq!(hi["label.rice"], "चावल");
        assert_eq!(hi["field.rainfall"], "वर्षा (मिमी)");

        assert_eq!(context.locale_table("fr"), None);
    }

    #[test]
    fn test_odia_title_and_fields() {
        let bundle = fixtures::bundle(CROP_RECOMMENDATION).unwrap();
        assert_eq!(bundle.title("or"), "ଫସଲ ସୁପାରିଶ");
        let fields = bundle.form_fields("or");
        assert_eq!(fields[6].label, "ବର୍ଷା (ମିମି)");

        let prediction = bundle.predict_record(&fixtures::recommendation_record(), "or").unwrap();
        assert_eq!(prediction.locale, "or");
        assert_eq!(prediction.label.as_deref(), Some("rice"));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let mut context = ServingContext::default();
        context.insert(fixtures::bundle(CROP_YIELD).unwrap()).unwrap();
        let err = context.insert(fixtures::bundle(CROP_YIELD).unwrap()).unwrap_err();
        assert!(matches!(err, ArtifactError::DuplicateModel(name) if name == CROP_YIELD));
    }
}
