//! API key resolution.
//!
//! Sources are consulted in order and the first non-empty one wins:
//!
//! 1. **Environment** - `NOTTE_API_KEY`
//! 2. **Keychain** - entry `api_key` under the `notte-cli` service
//! 3. **Config** - the `api_key` field of `config.json`

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use notte_fetch::{API_KEY_ENTRY, KeychainApi};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::env::{EnvSource, ProcessEnv};
use crate::error::StoreError;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "NOTTE_API_KEY";

// ============================================================================
// Credential
// ============================================================================

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// The `NOTTE_API_KEY` variable.
    Environment,
    /// The OS keychain.
    Keychain,
    /// The config file.
    Config,
}

impl CredentialSource {
    /// Lowercase tag used in output.
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialSource::Environment => "environment",
            CredentialSource::Keychain => "keychain",
            CredentialSource::Config => "config",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved API key and its provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The raw key.
    pub api_key: String,
    /// Which source supplied it.
    pub source: CredentialSource,
}

impl Credential {
    /// The key in a form safe to display.
    pub fn masked(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.masked())
            .field("source", &self.source)
            .finish()
    }
}

/// First 8 characters, `...`, last 4; `****` for keys shorter than 12.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "****".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves the API key from environment, keychain and config.
#[derive(Clone)]
pub struct CredentialResolver {
    keychain: Arc<dyn KeychainApi>,
    env: Arc<dyn EnvSource>,
    config_path: Option<PathBuf>,
}

impl CredentialResolver {
    /// Resolver over the process environment and the default config path.
    pub fn new(keychain: Arc<dyn KeychainApi>) -> Self {
        Self {
            keychain,
            env: Arc::new(ProcessEnv),
            config_path: None,
        }
    }

    /// Replaces the environment lookup.
    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    /// Reads the config from `path` instead of the default location.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// The keychain this resolver reads.
    pub fn keychain(&self) -> &Arc<dyn KeychainApi> {
        &self.keychain
    }

    /// Finds the API key.
    ///
    /// Keychain and config failures are logged and treated as "no key from
    /// this source".
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoApiKey`] when every source is empty.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<Credential, StoreError> {
        if let Some(api_key) = self.env.var(ENV_API_KEY) {
            debug!(source = "environment", "Resolved API key");
            return Ok(Credential {
                api_key,
                source: CredentialSource::Environment,
            });
        }

        match self.keychain.get(API_KEY_ENTRY).await {
            Ok(Some(api_key)) if !api_key.is_empty() => {
                debug!(source = "keychain", "Resolved API key");
                return Ok(Credential {
                    api_key,
                    source: CredentialSource::Keychain,
                });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Keychain unavailable, skipping"),
        }

        match self.load_config().await {
            Ok(Config {
                api_key: Some(api_key),
                ..
            }) if !api_key.is_empty() => {
                debug!(source = "config", "Resolved API key");
                return Ok(Credential {
                    api_key,
                    source: CredentialSource::Config,
                });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Config unreadable, skipping"),
        }

        Err(StoreError::NoApiKey)
    }

    async fn load_config(&self) -> Result<Config, StoreError> {
        match &self.config_path {
            Some(path) => Config::load_from(path).await,
            None => Config::load().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("sk_live_1234567890abcd"), "sk_live_...abcd");
        assert_eq!(mask_api_key("abcdefghijkl"), "abcdefgh...ijkl");
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key("abcdefghijk"), "****");
    }

    #[test]
    fn test_credential_debug_masks_key() {
        let credential = Credential {
            api_key: "sk_live_1234567890abcd".into(),
            source: CredentialSource::Keychain,
        };
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("1234567890"));
        assert!(rendered.contains("sk_live_...abcd"));
    }

    #[test]
    fn test_source_tags() {
        assert_eq!(CredentialSource::Environment.to_string(), "environment");
        assert_eq!(
            serde_json::to_value(CredentialSource::Keychain).unwrap(),
            "keychain"
        );
        assert_eq!(CredentialSource::Config.as_str(), "config");
    }
}
