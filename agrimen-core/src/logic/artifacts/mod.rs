//! Artifacts Module - Model directory loading
//!
//! A model directory holds `manifest.json` plus every file it references
//! (schema lives inline, encoders/scaler/model/locales are separate files).
//! Loading either succeeds completely or refuses the model.

pub mod loader;
pub mod manifest;
pub mod source;


pub use loader::{discover_model_dirs, load_bundle, load_model_dir};
pub use manifest::{Manifest, ModelFormat, ModelRef};
pub use source::{read_verified, sha256_hex, ArtifactSource, DirSource, MemorySource};
