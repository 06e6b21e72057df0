//! Bundle assembly
//!
//! manifest → schema layout → encoders → scaler → aligner → predictor →
//! formatter → locale catalog. Every cross-artifact invariant is checked here,
//! once, so serving code never re-validates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::manifest::{Manifest, ModelFormat};
use super::source::{read_verified, ArtifactSource, DirSource};
use crate::constants::MANIFEST_FILE;
use crate::error::ArtifactError;
use crate::logic::context::ModelBundle;
use crate::logic::features::{FeatureAligner, FeatureLayout, FittedScaler, LabelEncoder, ScalerArtifact};
use crate::logic::format::ResultFormatter;
use crate::logic::locale::LocaleCatalog;
use crate::logic::model::{Predictor, TaskKind, TreeEnsemble};

fn parse_json<T: serde::de::DeserializeOwned>(name: &str, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse { name: name.to_string(), source })
}

/// Build a ready-to-serve bundle from a manifest and its artifact source
pub fn load_bundle<S: ArtifactSource + ?Sized>(manifest: Manifest, source: &S) -> Result<ModelBundle, ArtifactError> {
    manifest.check()?;
    let read = |relative: &str| read_verified(source, relative, &manifest.checksums);

    let layout = FeatureLayout::compile(manifest.schema.clone())?;

    let mut encoders = HashMap::with_capacity(manifest.encoders.len());
    for (column, path) in &manifest.encoders {
        let encoder: LabelEncoder = parse_json(path, &read(path.as_str())?)?;
        encoders.insert(column.clone(), encoder);
    }

    let scaler = match &manifest.scaler {
        Some(path) => {
            let artifact: ScalerArtifact = parse_json(path, &read(path.as_str())?)?;
            FittedScaler::bind(&artifact, &layout)?
        }
        None => FittedScaler::identity(),
    };

    let width = layout.width();
    let aligner = FeatureAligner::new(layout, encoders, scaler, manifest.unknown_category)?;

    let target = match &manifest.target_encoder {
        Some(path) => Some(parse_json::<LabelEncoder>(path, &read(path.as_str())?)?),
        None => None,
    };
    let n_classes = target.as_ref().map(LabelEncoder::len);

    let predictor = load_predictor(&manifest, &read(manifest.model.path.as_str())?, width, n_classes)?;
    check_predictor(&manifest, predictor.as_ref(), width, n_classes)?;

    let catalog = match &manifest.locales {
        Some(path) => {
            let builtin = LocaleCatalog::builtin();
            let own = LocaleCatalog::from_json(path, &read(path.as_str())?, builtin.default_locale())?;
            builtin.merge(&own)?
        }
        None => LocaleCatalog::builtin().clone(),
    };

    let formatter = ResultFormatter::new(
        &manifest.name,
        manifest.task,
        target,
        manifest.output.clone(),
        manifest.details.clone(),
    )?;

    log::info!(
        "Loaded model '{}' from {} ({} features, {}, scaler: {})",
        manifest.name,
        source.describe(),
        width,
        predictor.method(),
        aligner.scaler().kind()
    );

    Ok(ModelBundle::new(
        manifest.name.clone(),
        manifest.title_key.clone(),
        manifest.model.format,
        source.describe(),
        aligner,
        predictor,
        formatter,
        catalog,
    ))
}

fn load_predictor(
    manifest: &Manifest,
    bytes: &[u8],
    width: usize,
    n_classes: Option<usize>,
) -> Result<Box<dyn Predictor>, ArtifactError> {
    match manifest.model.format {
        ModelFormat::TreeEnsemble => Ok(Box::new(TreeEnsemble::from_json(&manifest.model.path, bytes)?)),
        #[cfg(feature = "onnx")]
        ModelFormat::Onnx => Ok(Box::new(crate::logic::model::OnnxPredictor::from_bytes(
            bytes,
            width,
            manifest.task,
            n_classes,
        )?)),
        #[cfg(not(feature = "onnx"))]
        ModelFormat::Onnx => {
            let _ = (bytes, width, n_classes);
            Err(ArtifactError::UnsupportedFormat(format!(
                "{} (built without the `onnx` feature)",
                ModelFormat::Onnx.as_str()
            )))
        }
    }
}

/// Predictor must agree with the schema width, the task and the label set
fn check_predictor(
    manifest: &Manifest,
    predictor: &dyn Predictor,
    width: usize,
    n_classes: Option<usize>,
) -> Result<(), ArtifactError> {
    if predictor.task() != manifest.task {
        return Err(ArtifactError::InvalidModel(format!(
            "model file is {:?} but manifest declares {:?}",
            predictor.task(),
            manifest.task
        )));
    }
    if predictor.n_features() != width {
        return Err(ArtifactError::InvalidModel(format!(
            "model expects {} features, schema produces {}",
            predictor.n_features(),
            width
        )));
    }
    if manifest.task == TaskKind::Classification {
        if let (Some(model), Some(labels)) = (predictor.n_classes(), n_classes) {
            if model != labels {
                return Err(ArtifactError::InvalidModel(format!(
                    "model has {} classes, target encoder has {}",
                    model, labels
                )));
            }
        }
    }
    Ok(())
}

/// Load one model directory (`<dir>/manifest.json` + referenced files)
pub fn load_model_dir(dir: &Path) -> Result<ModelBundle, ArtifactError> {
    let source = DirSource::new(dir);
    let manifest = Manifest::from_json(MANIFEST_FILE, &source.read(MANIFEST_FILE)?)?;
    load_bundle(manifest, &source)
}

/// Sub-directories of `root` that contain a manifest, sorted by name
pub fn discover_model_dirs(root: &Path) -> Result<Vec<PathBuf>, ArtifactError> {
    if !root.is_dir() {
        return Err(ArtifactError::Missing(root.to_path_buf()));
    }

    let entries = std::fs::read_dir(root).map_err(|source| ArtifactError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Io { path: root.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_dir() {
            if path.join(MANIFEST_FILE).is_file() {
                dirs.push(path);
            } else {
                log::warn!("Skipping {} (no {})", path.display(), MANIFEST_FILE);
            }
        }
    }
    dirs.sort();
    Ok(dirs)
}
