//! Configuration management for gator.
//!
//! The config is a small JSON document at `~/.gatorconfig.json`:
//!
//! ```json
//! { "db_url": "sqlite:///home/me/.local/share/gator/gator.db", "current_user_name": "alice" }
//! ```
//!
//! It is read once at startup and rewritten whenever the logged-in user changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::Result;

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// Main configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub db_url: String,

    #[serde(default)]
    pub current_user_name: String,

    /// Optional HTTP timeout for feed fetches. No timeout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Read the config document at `path`.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the whole document back to `path`.
    pub fn save(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.gatorconfig.json`
    pub fn default_config_path() -> std::result::Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// Resolve `db_url` to something SQLite can open.
    ///
    /// Accepts a plain path, `sqlite://<path>`, `sqlite:<path>` or `:memory:`.
    /// An empty `db_url` falls back to `<data_dir>/gator/gator.db`.
    pub fn database_path(&self) -> std::result::Result<PathBuf, ConfigError> {
        let url = self.db_url.trim();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let gator_dir = data_dir.join("gator");
        fs::create_dir_all(&gator_dir).map_err(|e| ConfigError::Io {
            path: gator_dir.clone(),
            source: e,
        })?;
        Ok(gator_dir.join("gator.db"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Where the current-user identity is persisted.
pub trait ConfigStore: Send + Sync {
    /// The stored user name, `None` when unset or empty.
    fn current_user(&self) -> Option<String>;

    fn set_current_user(&mut self, name: &str) -> Result<()>;
}

/// Config store backed by the JSON file on disk.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    config: Config,
}

impl JsonConfigStore {
    pub fn load(path: PathBuf) -> std::result::Result<Self, ConfigError> {
        let config = Config::load(&path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(Self { path, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl ConfigStore for JsonConfigStore {
    fn current_user(&self) -> Option<String> {
        non_empty(&self.config.current_user_name)
    }

    fn set_current_user(&mut self, name: &str) -> Result<()> {
        let mut updated = self.config.clone();
        updated.current_user_name = name.to_string();
        updated.save(&self.path)?;
        self.config = updated;
        Ok(())
    }
}

/// Config store that never touches disk.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    current_user_name: String,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(name: &str) -> Self {
        Self {
            current_user_name: name.to_string(),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn current_user(&self) -> Option<String> {
        non_empty(&self.current_user_name)
    }

    fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.current_user_name = name.to_string();
        Ok(())
    }
}

fn non_empty(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
