mod database;

pub use database::DatabaseConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Storage configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Connection settings (see `database` table in social_storage.toml).
    #[serde(default)]
    pub database: DatabaseConfig,
}

const DEFAULT_CONFIG_FILE: &str = "social_storage.toml";
const ENV_PREFIX: &str = "SOCIAL_STORAGE_";

impl Config {
    /// Builds a Figment that merges defaults, `social_storage.toml` when present,
    /// and `SOCIAL_STORAGE_*` environment variables (`__` separates tables).
    pub fn figment() -> Figment {
        Self::figment_with_file(DEFAULT_CONFIG_FILE)
    }

    fn figment_with_file(path: impl AsRef<Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if PathBuf::from(path.as_ref()).is_file() {
            figment.merge(Toml::file(path.as_ref()))
        } else {
            figment
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration from defaults, the optional TOML file and the environment.
    pub fn load() -> StorageResult<Self> {
        Ok(Self::figment().extract()?)
    }

    /// Same as [`Config::load`] but reads the TOML file at `path`, which
    /// must exist.
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StorageError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Ok(Self::figment_with_file(path).extract()?)
    }
}
