//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] over a single `serde_json` document.  Fields
//! absent from the file take their defaults; a missing file means "all
//! defaults".  Config is validated after every load and before every save.

use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::BinConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "RECYCLER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "recycler.json";

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `RECYCLER_CONFIG`, or `recycler.json`.
    pub fn from_env() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<BinConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "JsonConfigFile: {} not found, using defaults",
                    self.path.display()
                );
                return Ok(BinConfig::default());
            }
            Err(_) => return Err(ConfigError::IoError),
        };

        let config: BinConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("JsonConfigFile: {} is malformed: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        info!("JsonConfigFile: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &BinConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;
        fs::write(&self.path, text).map_err(|_| ConfigError::IoError)?;
        info!("JsonConfigFile: saved {}", self.path.display());
        Ok(())
    }
}
