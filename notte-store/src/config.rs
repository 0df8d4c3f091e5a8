//! CLI configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::env::EnvSource;
use crate::error::StoreError;
use crate::persistence::{self, default_config_path};

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.notte.cc";

/// Console used for browser login.
pub const DEFAULT_CONSOLE_URL: &str = "https://console.notte.cc";

/// Overrides the API base URL.
pub const ENV_API_URL: &str = "NOTTE_API_URL";

/// Overrides the console base URL.
pub const ENV_CONSOLE_URL: &str = "NOTTE_CONSOLE_URL";

/// Supplies a session id to session-scoped commands.
pub const ENV_SESSION_ID: &str = "NOTTE_SESSION_ID";

/// Contents of `config.json`.
///
/// Both fields are optional and omitted from the file when unset. Unknown
/// fields in the file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// API key, used only when neither the environment nor the keychain has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Config {
    /// Config as it looks when no file exists.
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            api_url: Some(DEFAULT_API_URL.to_string()),
        }
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoHomeDir`] when the home directory is unknown.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        default_config_path()
    }

    /// Loads configuration from the default path.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path()?).await
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file yields [`Config::defaults`]. Empty fields are treated
    /// as unset and an unset URL becomes [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns read failures other than not-found and malformed JSON.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        let mut config: Config = match persistence::load_json(path).await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::defaults());
            }
            Err(e) => return Err(e),
        };

        config.api_key = config.api_key.filter(|k| !k.is_empty());
        config.api_url = config
            .api_url
            .filter(|u| !u.is_empty())
            .or_else(|| Some(DEFAULT_API_URL.to_string()));

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    ///
    /// # Errors
    ///
    /// See [`Config::save_to`].
    pub async fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path()?).await
    }

    /// Saves configuration to a specific path (0600 file, 0700 directory).
    ///
    /// # Errors
    ///
    /// Returns IO and serialization failures.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        persistence::save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Deletes the config file at `path`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns IO errors other than not-found.
    pub async fn reset_at(path: &Path) -> Result<bool, StoreError> {
        persistence::remove_file(path).await
    }

    /// API base URL to use: `NOTTE_API_URL`, then this config, then the default.
    pub fn effective_api_url(&self, env: &dyn EnvSource) -> String {
        env.var(ENV_API_URL)
            .or_else(|| self.api_url.clone().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}

/// Console base URL: `NOTTE_CONSOLE_URL` or [`DEFAULT_CONSOLE_URL`].
pub fn console_url(env: &dyn EnvSource) -> String {
    env.var(ENV_CONSOLE_URL)
        .unwrap_or_else(|| DEFAULT_CONSOLE_URL.to_string())
}
