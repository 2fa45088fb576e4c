#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for imgaudit
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/imgaudit/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use imgaudit_errors::{ConfigError, Error};
use imgaudit_types::{ColorChoice, HashAlgorithm, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub hashing: HashingConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub default_output: OutputFormat,
    #[serde(default)]
    pub color: ColorChoice,
}

/// Audit database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

/// Digest configuration for newly registered files
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HashingConfig {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

/// Directory scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// Defaults for approval and reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub operator: Option<String>,
    #[serde(default = "default_software")]
    pub software_used: String,
    pub report_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            follow_symlinks: false,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            operator: None,
            software_used: default_software(),
            report_dir: None,
        }
    }
}

fn default_busy_timeout() -> u64 {
    30
}

fn default_extensions() -> Vec<String> {
    vec![constants::DEFAULT_EXTENSION.to_string()]
}

fn default_software() -> String {
    constants::DEFAULT_SOFTWARE.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Merge overrides from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_vars<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(constants::ENV_DB) {
            self.store.db_path = Some(PathBuf::from(db));
        }

        if let Some(algorithm) = lookup(constants::ENV_HASH_ALGORITHM) {
            self.hashing.algorithm =
                algorithm.parse().map_err(|_| ConfigError::InvalidValue {
                    field: constants::ENV_HASH_ALGORITHM.to_string(),
                    value: algorithm,
                })?;
        }

        if let Some(operator) = lookup(constants::ENV_OPERATOR) {
            if !operator.trim().is_empty() {
                self.audit.operator = Some(operator);
            }
        }

        if let Some(color) = lookup(constants::ENV_COLOR) {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: constants::ENV_COLOR.to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Some(output) = lookup(constants::ENV_OUTPUT) {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: constants::ENV_OUTPUT.to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Get the audit database path (with default)
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.store.db_path.clone().unwrap_or_else(|| {
            data_dir().join(constants::DB_FILE)
        })
    }

    /// Directory for debug log files
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        data_dir().join(constants::LOGS_DIR)
    }

    /// Resolve the operator name, preferring an explicit value
    ///
    /// # Errors
    ///
    /// Returns an error if neither an explicit name nor `audit.operator` is set.
    pub fn operator(&self, explicit: Option<&str>) -> Result<String, Error> {
        explicit
            .map(str::to_string)
            .or_else(|| self.audit.operator.clone())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: "operator".to_string(),
                }
                .into()
            })
    }

    /// Normalized extension filter: lowercase, each with a leading dot
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        normalize_extensions(&self.scan.extensions)
    }
}

/// Normalize user-supplied extensions (`scn`, `.SCN`) to `.scn`
#[must_use]
pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|ext| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::APP_DIR)
}
