//! Demo model bundles
//!
//! Small hand-built models shaped like the four AGRIMEN deployments:
//! - `crop_recommendation`: 7 numerics, standard scaler, forest classifier
//! - `crop_yield`: label-encoded Crop/Season/State, boosted regressor
//! - `market_price`: one-hot market columns, forest regressor
//! - `odisha_yield`: one-hot + derived feature, robust scaler on a subset
//!
//! Built in memory; `write_model_dir` puts one on disk for loader tests.

use std::collections::BTreeMap;
use std::path::Path;

use super::artifacts::{load_bundle, sha256_hex, ArtifactSource, Manifest, MemorySource, ModelFormat, ModelRef};
use super::context::{ModelBundle, ServingContext};
use super::features::{
    DerivedFeature, DerivedOp, FeatureSchema, FieldSpec, InputRecord, LabelEncoder, ScalerArtifact, ScalerParams,
    SourceColumn, UnknownCategoryPolicy,
};
use super::format::{LabelDetails, OutputSpec};
use super::locale::LocaleTable;
use super::model::{Aggregation, SplitRule, TaskKind, TreeEnsemble, TreeSchema};
use crate::constants::{DEFAULT_LOCALE, MANIFEST_FILE};
use crate::error::ArtifactError;

pub const CROP_RECOMMENDATION: &str = "crop_recommendation";
pub const CROP_YIELD: &str = "crop_yield";
pub const MARKET_PRICE: &str = "market_price";
pub const ODISHA_YIELD: &str = "odisha_yield";

pub const MODEL_NAMES: [&str; 4] = [CROP_RECOMMENDATION, CROP_YIELD, MARKET_PRICE, ODISHA_YIELD];

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Depth-1 tree: `feature` vs `threshold`, then two leaves
fn stump(feature: i64, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> TreeSchema {
    TreeSchema {
        split_indices: vec![feature, -1, -1],
        thresholds: vec![threshold, 0.0, 0.0],
        children_left: vec![1, -1, -1],
        children_right: vec![2, -1, -1],
        values: vec![vec![], left, right],
    }
}

fn manifest(name: &str, task: TaskKind, schema: FeatureSchema, output: OutputSpec) -> Manifest {
    Manifest {
        format_version: crate::constants::MANIFEST_FORMAT_VERSION,
        name: name.to_string(),
        title_key: None,
        task,
        schema,
        model: ModelRef { format: ModelFormat::TreeEnsemble, path: "model.json".to_string() },
        scaler: None,
        encoders: BTreeMap::new(),
        target_encoder: None,
        locales: None,
        output,
        unknown_category: UnknownCategoryPolicy::Ignore,
        details: BTreeMap::new(),
        checksums: BTreeMap::new(),
    }
}

fn numeric_field(name: &str, label_key: &str, min: f64, max: f64, default: f64) -> SourceColumn {
    let mut column = SourceColumn::numeric(name);
    column.field = Some(FieldSpec {
        label_key: Some(label_key.to_string()),
        ..FieldSpec::range(min, max, default)
    });
    column
}

// ============================================================================
// CROP RECOMMENDATION
// ============================================================================

pub fn crop_recommendation() -> Result<(Manifest, MemorySource), ArtifactError> {
    let schema = FeatureSchema {
        version: 1,
        columns: vec![
            numeric_field("N", "field.n", 0.0, 200.0, 50.0),
            numeric_field("P", "field.p", 0.0, 200.0, 50.0),
            numeric_field("K", "field.k", 0.0, 200.0, 50.0),
            numeric_field("temperature", "field.temperature", -10.0, 60.0, 25.0),
            numeric_field("humidity", "field.humidity", 0.0, 100.0, 50.0),
            numeric_field("ph", "field.ph", 0.0, 14.0, 6.5),
            numeric_field("rainfall", "field.rainfall", 0.0, 500.0, 100.0),
        ],
        derived: vec![],
        feature_names: vec![],
        layout_hash: None,
    };

    let output = OutputSpec::new("Predicted Crop");
    let mut m = manifest(CROP_RECOMMENDATION, TaskKind::Classification, schema, output);
    m.title_key = Some("model.crop_recommendation".to_string());
    m.scaler = Some("scaler.json".to_string());
    m.target_encoder = Some("encoders/label.json".to_string());
    m.locales = Some("locales.json".to_string());

    for (crop, sowing, harvest, duration) in [
        ("maize", "June-July", "September-October", "90-110 days"),
        ("rice", "June-July", "November-December", "120-150 days"),
        ("wheat", "October-December", "March-April", "120-150 days"),
    ] {
        let details: LabelDetails = [("sowing", sowing), ("harvest", harvest), ("duration", duration)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        m.details.insert(crop.to_string(), details);
    }

    let mut source = MemorySource::new(CROP_RECOMMENDATION);
    source.insert_json(
        "scaler.json",
        &ScalerArtifact {
            columns: vec![],
            params: ScalerParams::Standard {
                mean: vec![50.0, 50.0, 50.0, 25.0, 70.0, 6.5, 100.0],
                scale: vec![30.0, 30.0, 30.0, 5.0, 20.0, 1.0, 60.0],
            },
        },
    )?;
    source.insert_json("encoders/label.json", &LabelEncoder::from_strs(&["maize", "rice", "wheat"])?)?;
    source.insert_json(
        "model.json",
        &TreeEnsemble {
            task: TaskKind::Classification,
            n_features: 7,
            n_classes: Some(3),
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            split_rule: SplitRule::LessOrEqual,
            trees: vec![
                // scaled rainfall
                stump(6, 0.5, vec![6.0, 1.0, 3.0], vec![0.0, 9.0, 1.0]),
                // scaled humidity
                stump(4, 0.0, vec![2.0, 0.0, 8.0], vec![1.0, 8.0, 1.0]),
            ],
        },
    )?;

    let mut locales: BTreeMap<String, LocaleTable> = BTreeMap::new();
    for (locale, entries) in [
        (
            "en",
            [
                ("model.crop_recommendation", "Crop Recommendation"),
                ("field.n", "Nitrogen (N)"),
                ("field.p", "Phosphorus (P)"),
                ("field.k", "Potassium (K)"),
                ("field.temperature", "Temperature (°C)"),
                ("field.humidity", "Humidity (%)"),
                ("field.ph", "pH"),
                ("field.rainfall", "Rainfall (mm)"),
            ],
        ),
        (
            "hi",
            [
                ("model.crop_recommendation", "फसल सिफारिश"),
                ("field.n", "नाइट्रोजन (N)"),
                ("field.p", "फॉस्फोरस (P)"),
                ("field.k", "पोटैशियम (K)"),
                ("field.temperature", "तापमान (°C)"),
                ("field.humidity", "आर्द्रता (%)"),
                ("field.ph", "पीएच"),
                ("field.rainfall", "वर्षा (मिमी)"),
            ],
        ),
        (
            "or",
            [
                ("model.crop_recommendation", "ଫସଲ ସୁପାରିଶ"),
                ("field.n", "ନାଇଟ୍ରୋଜେନ (N)"),
                ("field.p", "ଫସଫରସ (P)"),
                ("field.k", "ପୋଟାସିୟମ (K)"),
                ("field.temperature", "ତାପମାତ୍ରା (°C)"),
                ("field.humidity", "ଆର୍ଦ୍ରତା (%)"),
                ("field.ph", "pH"),
                ("field.rainfall", "ବର୍ଷା (ମିମି)"),
            ],
        ),
    ] {
        let table = entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        locales.insert(locale.to_string(), table);
    }
    source.insert_json("locales.json", &locales)?;

    // pin every file
    let files: Vec<String> = m.referenced_files().into_iter().map(String::from).collect();
    for file in files {
        let bytes = source.read(&file)?;
        m.checksums.insert(file, sha256_hex(&bytes));
    }

    Ok((m, source))
}

/// Record that lands on `rice`
pub fn recommendation_record() -> InputRecord {
    InputRecord::new()
        .with("N", 90.0)
        .with("P", 42.0)
        .with("K", 43.0)
        .with("temperature", 20.8)
        .with("humidity", 82.0)
        .with("ph", 6.5)
        .with("rainfall", 202.9)
}

// ============================================================================
// CROP YIELD (label-encoded)
// ============================================================================

pub const CROP_YIELD_COLUMNS: [&str; 9] = [
    "Crop",
    "Crop_Year",
    "Season",
    "State",
    "Area",
    "Production",
    "Annual_Rainfall",
    "Fertilizer",
    "Pesticide",
];

pub fn crop_yield() -> Result<(Manifest, MemorySource), ArtifactError> {
    let columns = CROP_YIELD_COLUMNS
        .iter()
        .map(|&name| match name {
            "Crop" | "Season" | "State" => SourceColumn::label(name),
            _ => SourceColumn::numeric(name),
        })
        .collect();
    let schema = FeatureSchema { version: 1, columns, derived: vec![], feature_names: vec![], layout_hash: None };

    let mut output = OutputSpec::new("Predicted_Yield");
    output.unit_key = Some("unit.tonnes_per_hectare".to_string());
    let mut m = manifest(CROP_YIELD, TaskKind::Regression, schema, output);

    let mut source = MemorySource::new(CROP_YIELD);
    for (column, classes) in [
        ("Crop", ["Maize", "Rice", "Wheat"]),
        ("Season", ["Kharif", "Rabi", "Whole Year"]),
        ("State", ["Assam", "Odisha", "Punjab"]),
    ] {
        let path = format!("encoders/{}.json", column.to_lowercase());
        source.insert_json(&path, &LabelEncoder::from_strs(&classes)?)?;
        m.encoders.insert(column.to_string(), path);
    }

    source.insert_json(
        "model.json",
        &TreeEnsemble {
            task: TaskKind::Regression,
            n_features: 9,
            n_classes: None,
            aggregation: Aggregation::Sum,
            base_score: 1.5,
            split_rule: SplitRule::Less,
            trees: vec![
                stump(7, 50_000.0, vec![-0.3], vec![0.6]),
                stump(6, 1_000.0, vec![-0.2], vec![0.4]),
                stump(0, 0.5, vec![-0.1], vec![0.2]),
            ],
        },
    )?;

    Ok((m, source))
}

/// Header plus two rows; the first row yields 2.70, the second 0.90
pub fn crop_yield_csv() -> String {
    let mut csv = CROP_YIELD_COLUMNS.join(",");
    csv.push('\n');
    csv.push_str("Rice,2019,Kharif     ,Odisha,1000,2500,1400.5,80000,1200\n");
    csv.push_str("Maize,2018,Rabi,Punjab,500,900,600,20000,300\n");
    csv
}

// ============================================================================
// MARKET PRICE (one-hot)
// ============================================================================

pub fn market_price() -> Result<(Manifest, MemorySource), ArtifactError> {
    let schema = FeatureSchema {
        version: 2,
        columns: vec![
            SourceColumn::one_hot("District"),
            SourceColumn::one_hot("Market"),
            SourceColumn::one_hot("Commodity"),
            SourceColumn::one_hot("Variety"),
            SourceColumn::one_hot("Grade"),
            SourceColumn::numeric("Year"),
            SourceColumn::numeric("Month"),
            SourceColumn::numeric("DayOfWeek"),
        ],
        derived: vec![],
        feature_names: strings(&[
            "Year",
            "Month",
            "DayOfWeek",
            "District_Cuttack",
            "District_Puri",
            "Market_Cuttack",
            "Market_Nimapara",
            "Commodity_Onion",
            "Commodity_Paddy",
            "Variety_Local",
            "Variety_Other",
            "Grade_FAQ",
            "Grade_Medium",
        ]),
        layout_hash: None,
    };

    let m = manifest(MARKET_PRICE, TaskKind::Regression, schema, OutputSpec::new("Predicted_Price (₹)"));

    let mut source = MemorySource::new(MARKET_PRICE);
    source.insert_json(
        "model.json",
        &TreeEnsemble {
            task: TaskKind::Regression,
            n_features: 13,
            n_classes: None,
            aggregation: Aggregation::Mean,
            base_score: 0.0,
            split_rule: SplitRule::LessOrEqual,
            trees: vec![
                stump(7, 0.5, vec![2100.0], vec![1800.0]),
                stump(0, 2022.5, vec![1900.0], vec![2300.0]),
            ],
        },
    )?;

    Ok((m, source))
}

/// Paddy in Cuttack, 2023; predicts 2200.00
pub fn market_record() -> InputRecord {
    InputRecord::new()
        .with("District", "Cuttack")
        .with("Market", "Cuttack")
        .with("Commodity", "Paddy")
        .with("Variety", "Local")
        .with("Grade", "FAQ")
        .with("Year", 2023.0)
        .with("Month", 11.0)
        .with("DayOfWeek", 2.0)
}

// ============================================================================
// ODISHA YIELD (one-hot + derived + partial robust scaler)
// ============================================================================

pub const RAINFALL: &str = "Annual rainfall (mm)";
pub const PESTICIDE: &str = "Pesticide and fertilizer used (kg/hectare)";

pub fn odisha_yield() -> Result<(Manifest, MemorySource), ArtifactError> {
    let schema = FeatureSchema {
        version: 1,
        columns: vec![
            SourceColumn::one_hot("Crop type"),
            SourceColumn::one_hot("Season"),
            SourceColumn::one_hot("District"),
            SourceColumn::numeric(RAINFALL),
            SourceColumn::numeric(PESTICIDE),
        ],
        derived: vec![DerivedFeature {
            name: "Rainfall_Pesticide".to_string(),
            op: DerivedOp::Product,
            inputs: strings(&[RAINFALL, PESTICIDE]),
        }],
        feature_names: strings(&[
            RAINFALL,
            PESTICIDE,
            "Rainfall_Pesticide",
            "Crop type_Rice",
            "Crop type_Maize",
            "Season_Kharif",
            "Season_Rabi",
            "District_Cuttack",
            "District_Puri",
        ]),
        layout_hash: None,
    };

    let mut output = OutputSpec::new("Predicted_Yield");
    output.unit_key = Some("unit.tonnes_per_hectare".to_string());
    let mut m = manifest(ODISHA_YIELD, TaskKind::Regression, schema, output);
    m.scaler = Some("scaler.json".to_string());

    let mut source = MemorySource::new(ODISHA_YIELD);
    source.insert_json(
        "scaler.json",
        &ScalerArtifact {
            columns: strings(&[RAINFALL, PESTICIDE, "Rainfall_Pesticide"]),
            params: ScalerParams::Robust {
                center: vec![1400.0, 120.0, 168_000.0],
                scale: vec![300.0, 40.0, 60_000.0],
            },
        },
    )?;
    source.insert_json(
        "model.json",
        &TreeEnsemble {
            task: TaskKind::Regression,
            n_features: 9,
            n_classes: None,
            aggregation: Aggregation::Sum,
            base_score: 2.0,
            split_rule: SplitRule::Less,
            trees: vec![
                stump(2, 0.0, vec![-0.25], vec![0.35]),
                stump(3, 0.5, vec![0.1], vec![0.5]),
            ],
        },
    )?;

    Ok((m, source))
}

/// Rice, Kharif, Cuttack; predicts 2.85
pub fn odisha_record() -> InputRecord {
    InputRecord::new()
        .with("Crop type", "Rice")
        .with("Season", "Kharif")
        .with("District", "Cuttack")
        .with(RAINFALL, 1500.0)
        .with(PESTICIDE, 130.0)
}

// ============================================================================
// BUNDLES
// ============================================================================

pub fn artifacts_for(name: &str) -> Result<(Manifest, MemorySource), ArtifactError> {
    match name {
        CROP_RECOMMENDATION => crop_recommendation(),
        CROP_YIELD => crop_yield(),
        MARKET_PRICE => market_price(),
        ODISHA_YIELD => odisha_yield(),
        other => Err(ArtifactError::Missing(Path::new(other).to_path_buf())),
    }
}

pub fn bundle(name: &str) -> Result<ModelBundle, ArtifactError> {
    let (manifest, source) = artifacts_for(name)?;
    load_bundle(manifest, &source)
}

/// Context serving all four demo models
pub fn serving_context() -> Result<ServingContext, ArtifactError> {
    let mut context = ServingContext::new(DEFAULT_LOCALE);
    for name in MODEL_NAMES {
        context.insert(bundle(name)?)?;
    }
    Ok(context)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io { path, source }
}

/// Write `manifest.json` and every in-memory file under `dir`
pub fn write_model_dir(dir: &Path, manifest: &Manifest, source: &MemorySource) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|source| ArtifactError::Parse {
        name: MANIFEST_FILE.to_string(),
        source,
    })?;
    std::fs::write(&manifest_path, bytes).map_err(io_error(&manifest_path))?;

    for (relative, bytes) in source.files() {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        std::fs::write(&path, bytes).map_err(io_error(&path))?;
    }
    Ok(())
}
