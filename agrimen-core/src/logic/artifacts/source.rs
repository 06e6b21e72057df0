//! Artifact sources
//!
//! Where artifact bytes come from: a model directory on disk, or memory
//! (tests, embedded demo models). Checksums are verified on every read.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::ArtifactError;

/// Read-only artifact storage for one model
pub trait ArtifactSource {
    /// Raw bytes of `relative`
    fn read(&self, relative: &str) -> Result<Vec<u8>, ArtifactError>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// SHA-256 of `bytes` as lowercase hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read `relative` and compare against the pinned checksum, if any
pub fn read_verified<S: ArtifactSource + ?Sized>(
    source: &S,
    relative: &str,
    checksums: &BTreeMap<String, String>,
) -> Result<Vec<u8>, ArtifactError> {
    let bytes = source.read(relative)?;

    if let Some(expected) = checksums.get(relative) {
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            log::error!("Checksum mismatch for {} in {}", relative, source.describe());
            return Err(ArtifactError::ChecksumMismatch {
                file: relative.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        log::debug!("Checksum verified: {}", relative);
    }

    Ok(bytes)
}

/// Reject absolute paths and `..` so a manifest cannot read outside its directory
fn safe_relative(relative: &str) -> Result<&Path, ArtifactError> {
    let path = Path::new(relative);
    let safe = !relative.is_empty()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path)
    } else {
        Err(ArtifactError::UnsafePath(relative.to_string()))
    }
}

// ============================================================================
// DIRECTORY
// ============================================================================

#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSource for DirSource {
    fn read(&self, relative: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.dir.join(safe_relative(relative)?);
        if !path.is_file() {
            return Err(ArtifactError::Missing(path));
        }
        std::fs::read(&path).map_err(|source| ArtifactError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

// ============================================================================
// MEMORY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new(label: &str) -> Self {
        Self { label: label.to_string(), files: HashMap::new() }
    }

    pub fn with_file(mut self, relative: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(relative, bytes);
        self
    }

    pub fn insert(&mut self, relative: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(relative.to_string(), bytes.into());
    }

    /// Serialize `value` as JSON into `relative`
    pub fn insert_json<T: serde::Serialize>(&mut self, relative: &str, value: &T) -> Result<(), ArtifactError> {
        let bytes = serde_json::to_vec(value).map_err(|source| ArtifactError::Parse {
            name: relative.to_string(),
            source,
        })?;
        self.insert(relative, bytes);
        Ok(())
    }

    /// Stored files, in no particular order
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }
}

impl ArtifactSource for MemorySource {
    fn read(&self, relative: &str) -> Result<Vec<u8>, ArtifactError> {
        safe_relative(relative)?;
        self.files
            .get(relative)
            .cloned()
            .ok_or_else(|| ArtifactError::Missing(PathBuf::from(format!("{}:{}", self.label, relative))))
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_read_verified() {
        let source = MemorySource::new("t").with_file("a.json", b"abc".to_vec());
        let mut checksums = BTreeMap::new();
        assert_eq!(read_verified(&source, "a.json", &checksums).unwrap(), b"abc");

        checksums.insert("a.json".to_string(), sha256_hex(b"abc").to_uppercase());
        assert!(read_verified(&source, "a.json", &checksums).is_ok());

        checksums.insert("a.json".to_string(), sha256_hex(b"abd"));
        let err = read_verified(&source, "a.json", &checksums).unwrap_err();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { ref file, .. } if file == "a.json"));
    }

    #[test]
    fn test_unsafe_paths_rejected() {
        let source = MemorySource::new("t");
        for bad in ["../secret.json", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(source.read(bad), Err(ArtifactError::UnsafePath(_))), "{}", bad);
        }
        assert!(matches!(source.read("missing.json"), Err(ArtifactError::Missing(_))));
    }

    #[test]
    fn test_dir_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("enc")).unwrap();
        std::fs::write(dir.path().join("enc/crop.json"), b"{}").unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.read("enc/crop.json").unwrap(), b"{}");
        assert!(matches!(source.read("enc/season.json"), Err(ArtifactError::Missing(_))));
    }
}
