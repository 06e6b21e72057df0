//! Central Configuration Constants
//!
//! Single source of truth for serving defaults.

/// Manifest file expected inside every model artifact directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest format understood by this build
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Default artifacts root
pub const DEFAULT_ARTIFACTS_DIR: &str = "./artifacts";

/// Locale used when the requested one is unknown
pub const DEFAULT_LOCALE: &str = "en";

/// Default number of decimals for regression output
pub const DEFAULT_PRECISION: usize = 2;

/// Upper bound on output decimals a manifest may request
pub const MAX_PRECISION: usize = 10;

/// Column added to lenient batch output for rows that could not be scored
pub const ERROR_COLUMN: &str = "error";

/// Environment variable pointing at the artifacts root
pub const ENV_ARTIFACTS_DIR: &str = "ARTIFACTS_DIR";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get artifacts root from environment or use default
pub fn get_artifacts_dir() -> String {
    std::env::var(ENV_ARTIFACTS_DIR)
        .unwrap_or_else(|_| DEFAULT_ARTIFACTS_DIR.to_string())
}
