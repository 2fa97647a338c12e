use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub display: DisplayConfig,
}

/// Locations of the flat files the tool reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub filter_sets: PathBuf,
    pub users: PathBuf,
    /// Holds the encrypted login token between invocations
    pub session_token: PathBuf,
    /// Key that encrypts login tokens; created on first login
    pub session_key: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            filter_sets: PathBuf::from("named_filters.json"),
            users: PathBuf::from("users.json"),
            session_token: PathBuf::from(".sheet-filter/session"),
            session_key: PathBuf::from(".sheet-filter/session.key"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub expiry_days: u32,
    /// Saving and deleting filter sets requires a logged-in user
    pub require_login: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            require_login: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preview_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { preview_rows: 20 }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static AppConfig {
    static DEFAULT_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::default);
    &DEFAULT_CONFIG
}
