// crates/picaimport-cli/src/context.rs - Run context
//
// Everything a batch needs that is fixed for the whole run: the validated
// options, the loaded store configuration and the one open store session.
// Commands receive it explicitly; nothing is global.

use anyhow::{Context as AnyhowContext, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

use picaimport_core::{
    ConfigError, ConfigManager, PicaStoreConfig, RecordStore, RunOptions, store,
};

/// Application context passed to the batch
pub struct Context {
    pub store: Box<dyn RecordStore>,
    options: RunOptions,
    config: PicaStoreConfig,
    config_path: PathBuf,
}

impl Context {
    /// Load the configuration and open the store session
    ///
    /// Configuration precedence: -config FILE > $PICASTORE > picastore.conf.
    pub fn new(config_path: Option<PathBuf>, options: RunOptions) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(ConfigManager::default_path);

        let config = ConfigManager::load(&config_path).map_err(|e| match e {
            ConfigError::FileNotFound(_) => anyhow!(
                "{}\n\nA minimal configuration looks like this:\n\n{}",
                e,
                ConfigManager::default_config_content()
            ),
            other => anyhow!(other),
        })?;

        let store = store::open(&config.store).with_context(|| {
            format!(
                "Failed to open the record store configured in {}",
                config_path.display()
            )
        })?;
        info!(store = %store.describe(), mode = %options.mode, "session opened");

        Ok(Self {
            store,
            options,
            config,
            config_path,
        })
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Whether PPN check characters are verified before store calls
    pub fn check_ppn(&self) -> bool {
        self.config.records.check_ppn
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
