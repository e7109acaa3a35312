//! # Configuration
//!
//! Optional TOML configuration for the binary.
//!
//! Lookup order: the file named by `--config` (must exist), then
//! `hivecase.toml` inside the case directory, then built-in defaults.
//!
//! ```toml
//! [acquire]
//! max_export_bytes = 268435456
//!
//! [log]
//! format = "json"
//! ```

use hivecase_core::CaseError;
use hivecase_core::primitives::{CONFIG_FILE, DEFAULT_MAX_EXPORT_BYTES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub acquire: AcquireConfig,
    pub log: LogConfig,
}

/// Settings for the export acquirer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcquireConfig {
    /// Exports larger than this are skipped.
    pub max_export_bytes: u64,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            max_export_bytes: DEFAULT_MAX_EXPORT_BYTES,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `HIVECASE_LOG_FORMAT` value; anything but `json` is text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, CaseError> {
        toml::from_str(text)
            .map_err(|e| CaseError::Serialization(format!("Invalid configuration: {}", e)))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, CaseError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CaseError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CaseError::Serialization(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            CaseError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the configuration for a run over `case_directory`.
    pub fn resolve(explicit: Option<&Path>, case_directory: &Path) -> Result<Self, CaseError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let in_case = case_config_path(case_directory);
        if in_case.is_file() {
            tracing::debug!(path = %in_case.display(), "using case configuration");
            return Self::load(&in_case);
        }
        Ok(Self::default())
    }
}

/// Location of the per-case configuration file.
#[must_use]
pub fn case_config_path(case_directory: &Path) -> PathBuf {
    case_directory.join(CONFIG_FILE)
}
