//! Configuration loading and recordings directory resolution
//!
//! Settings are an explicit value ([`IndexSettings`]) handed to the index
//! rather than a process-wide mutable object, so every consumer states the
//! configuration it depends on in its signature.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the recordings directory
pub const RECORDINGS_DIR_ENV: &str = "BCRG_RECORDINGS_DIR";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "BCRG_CONFIG";

/// Default filename pattern: BCR's own naming scheme
pub const DEFAULT_FILENAME_PATTERN: &str =
    "^{date}(_{direction})?(_sim{sim_slot})?_{phone_number}(_{contact_name})?";

/// Name of the database document kept inside the recordings directory
pub const DEFAULT_DATABASE_FILENAME: &str = ".bcr-gui-database.json";

/// Audio MIME types picked up from the recordings directory
pub const DEFAULT_SUPPORTED_TYPES: &[&str] = &[
    "audio/flac",
    "audio/mpeg",
    "audio/ogg",
    "audio/x-wav",
    "audio/mp4",
];

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// On-disk TOML configuration
///
/// Every field is optional; missing values fall back to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding BCR recordings
    pub recordings_directory: Option<PathBuf>,
    /// User-edited filename pattern template
    pub filename_pattern: Option<String>,
    /// Override for the accepted audio MIME types
    pub supported_types: Option<Vec<String>>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by the index engine
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSettings {
    /// Filename pattern template (source of truth; recompiled on demand)
    pub filename_pattern: String,
    /// Audio MIME types considered recordings
    pub supported_types: Vec<String>,
    /// Database document filename inside the recordings directory
    pub database_filename: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            supported_types: DEFAULT_SUPPORTED_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
        }
    }
}

impl IndexSettings {
    /// Build settings from a TOML config, defaulting what it leaves out
    pub fn from_toml(config: &TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            filename_pattern: config
                .filename_pattern
                .clone()
                .unwrap_or(defaults.filename_pattern),
            supported_types: config
                .supported_types
                .clone()
                .unwrap_or(defaults.supported_types),
            database_filename: defaults.database_filename,
        }
    }

    /// True if the given MIME type is a supported audio type
    pub fn is_supported_type(&self, mime_type: &str) -> bool {
        self.supported_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
}

/// Locate the config file
///
/// Priority order:
/// 1. `BCRG_CONFIG` environment variable
/// 2. `<config_dir>/bcrg/config.toml`
pub fn config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("bcrg").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Load the config file, degrading to defaults
///
/// A missing file is normal (first run); an unreadable or malformed file is
/// logged and ignored so the tool still starts.
pub fn load_config_or_default() -> TomlConfig {
    let path = match config_file_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(error = %e, "No config location, using defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
            TomlConfig::default()
        }
    }
}

/// Write a TOML config atomically (temp file + rename)
///
/// The filename pattern is written as given; `bcrg_index::config::save_config`
/// validates it first.
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp = target.with_extension("toml.tmp");
    std::fs::write(&temp, content)?;
    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }

    tracing::debug!(path = %target.display(), "Config written");
    Ok(())
}

/// Recordings directory resolution
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
///
/// There is no compiled default: the recordings directory is wherever the
/// user told BCR to write, so an unresolved directory is a config error.
pub fn resolve_recordings_directory(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.recordings_directory {
        return Ok(path.clone());
    }

    Err(Error::Config(format!(
        "Recordings directory not configured (use --dir, {} or recordings_directory in config.toml)",
        env_var_name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = IndexSettings::default();
        assert_eq!(settings.filename_pattern, DEFAULT_FILENAME_PATTERN);
        assert_eq!(settings.database_filename, ".bcr-gui-database.json");
        assert!(settings.is_supported_type("audio/ogg"));
        assert!(settings.is_supported_type("AUDIO/FLAC"));
        assert!(!settings.is_supported_type("application/json"));
    }

    #[test]
    fn test_settings_from_partial_toml() {
        let config: TomlConfig = toml::from_str(
            r#"
            filename_pattern = "^{phone_number}_{date}"
            "#,
        )
        .unwrap();

        let settings = IndexSettings::from_toml(&config);
        assert_eq!(settings.filename_pattern, "^{phone_number}_{date}");
        assert_eq!(settings.supported_types.len(), DEFAULT_SUPPORTED_TYPES.len());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            recordings_directory: Some(PathBuf::from("/from/config")),
            ..Default::default()
        };
        let dir = resolve_recordings_directory(
            Some(Path::new("/from/cli")),
            "BCRG_TEST_UNSET_VARIABLE",
            &config,
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/from/cli"));
    }
}
