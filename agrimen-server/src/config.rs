//! Configuration module

use std::env;
use std::path::PathBuf;

use agrimen_core::constants::{get_artifacts_dir, DEFAULT_ARTIFACTS_DIR, DEFAULT_LOCALE};
use agrimen_core::BatchPolicy;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory with one sub-directory per model
    pub artifacts_dir: PathBuf,

    /// Server port
    pub port: u16,

    /// Locale used when a request names none (or an unknown one)
    pub default_locale: String,

    /// Batch policy when the upload does not pick one
    pub batch_policy: BatchPolicy,

    /// Upload size limit in bytes
    pub max_upload_bytes: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            artifacts_dir: PathBuf::from(get_artifacts_dir()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            default_locale: env::var("DEFAULT_LOCALE")
                .unwrap_or_else(|_| DEFAULT_LOCALE.to_string()),

            batch_policy: env::var("BATCH_POLICY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(10 * 1024 * 1024),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            port: 8080,
            default_locale: DEFAULT_LOCALE.to_string(),
            batch_policy: BatchPolicy::Strict,
            max_upload_bytes: 10 * 1024 * 1024,
            environment: "development".to_string(),
        }
    }
}
