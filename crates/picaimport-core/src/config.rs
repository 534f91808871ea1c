// crates/picaimport-core/src/config.rs - Store connection configuration
//
// The configuration file (picastore.conf by default) says which record store
// a run talks to. It is TOML:
//
// ```toml
// [store]
// backend = "sqlite"        # "sqlite" or "memory"
// path = "records.db"       # relative paths are taken from the config file's directory
//
// [records]
// check_ppn = false         # verify PPN check characters before calling the store
// ```
//
// CONFIGURATION HIERARCHY (highest to lowest priority):
// 1. -config FILE on the command line
// 2. PICASTORE environment variable
// 3. picastore.conf in the current directory

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "picastore.conf";

/// Environment variable overriding the configuration file
pub const CONFIG_ENV: &str = "PICASTORE";

/// Errors that can occur during configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML syntax in {file}: {error}")]
    ParseError { file: String, error: String },

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("I/O error reading config: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete configuration of a run's record store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PicaStoreConfig {
    /// Which store to open
    #[serde(default)]
    pub store: StoreConfig,

    /// Record handling rules
    #[serde(default)]
    pub records: RecordsConfig,
}

/// Store backend kinds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

/// Store section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Database file for the sqlite backend
    #[serde(default = "default_store_path")]
    pub path: Option<PathBuf>,
}

fn default_store_path() -> Option<PathBuf> {
    Some(PathBuf::from("picastore.db"))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: default_store_path(),
        }
    }
}

/// Records section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordsConfig {
    /// Reject PPNs whose check character does not match
    #[serde(default)]
    pub check_ppn: bool,
}

/// Loads and validates configuration files
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a file
    ///
    /// Relative store paths are resolved against the directory holding the
    /// configuration file, so a config can be used from any working directory.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> ConfigResult<PicaStoreConfig> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content, &path.display().to_string())?;

        if let Some(store_path) = &config.store.path {
            if store_path.is_relative() {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                config.store.path = Some(base.join(store_path));
            }
        }

        debug!(backend = ?config.store.backend, "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration text; `origin` names it in errors
    pub fn parse(content: &str, origin: &str) -> ConfigResult<PicaStoreConfig> {
        let config: PicaStoreConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError {
                file: origin.to_string(),
                error: e.to_string(),
            })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate_config(config: &PicaStoreConfig) -> ConfigResult<()> {
        if config.store.backend == Backend::Sqlite {
            match &config.store.path {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => {
                    return Err(ConfigError::ValidationError(
                        "store.path must be set for the sqlite backend".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Configuration file to use when none is given on the command line
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// A commented starter configuration
    pub fn default_config_content() -> String {
        r#"# picaimport store configuration

[store]
# "sqlite" for a local database file, "memory" for dry runs
backend = "sqlite"
path = "picastore.db"

[records]
# Refuse PPNs with a wrong check character
check_ppn = false
"#
        .to_string()
    }
}
