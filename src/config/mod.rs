//! Configuration loading and management.
//!
//! Handles parsing of `config.toml`. Everything has a working default: a
//! missing file yields the default config, and the session cookie can
//! come from the `PTM_SESSION_COOKIE` environment variable instead of the
//! file (so the cookie never has to live on disk).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the outline service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Browser session cookie, e.g. `sessionid=...`
    #[serde(default)]
    pub session_cookie: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_cookie: None,
        }
    }
}

fn default_base_url() -> String {
    "https://workflowy.com".to_string()
}

/// Local storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the default data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// The default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ptm").join("config.toml"))
    }

    /// Load configuration from an explicit path, or the default location
    /// when none is given. A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Config::default()),
            },
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// The session cookie: `PTM_SESSION_COOKIE` wins over the file.
    pub fn session_cookie(&self) -> Option<String> {
        env::var("PTM_SESSION_COOKIE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api.session_cookie.clone())
    }

    /// Resolve the data directory.
    ///
    /// Priority: explicit flag > config file > platform data dir > `.ptm`
    /// in the working directory.
    pub fn data_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        if let Some(dir) = &self.storage.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("ptm"))
            .unwrap_or_else(|| PathBuf::from(".ptm"))
    }
}
