//! Secure credential storage.
//!
//! The [`KeychainApi`] trait is the seam between credential consumers and the
//! backing store:
//! - [`SystemKeychain`] talks to macOS Keychain, Windows Credential Manager
//!   or the freedesktop Secret Service
//! - [`MemoryKeychain`] keeps entries in a map, for tests and headless runs
//!
//! Both are scoped to a single service name; callers address entries by key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::error::KeychainError;

/// Service name under which the CLI stores its secrets.
pub const KEYRING_SERVICE: &str = "notte-cli";

/// Entry holding the API key.
pub const API_KEY_ENTRY: &str = "api_key";

// ============================================================================
// Keychain API Trait
// ============================================================================

/// API for secure credential storage.
#[async_trait]
pub trait KeychainApi: Send + Sync {
    /// Get a secret.
    ///
    /// # Returns
    /// * `Ok(Some(secret))` - Entry found
    /// * `Ok(None)` - No such entry
    /// * `Err(e)` - The store could not be read
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError>;

    /// Store a secret, replacing any previous value.
    async fn set(&self, key: &str, secret: &str) -> Result<(), KeychainError>;

    /// Remove a secret. Removing a missing entry succeeds.
    async fn delete(&self, key: &str) -> Result<(), KeychainError>;

    /// Check if an entry exists.
    async fn exists(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }
}

/// The OS keychain scoped to [`KEYRING_SERVICE`].
pub fn default_keychain() -> Arc<dyn KeychainApi> {
    Arc::new(SystemKeychain::new(KEYRING_SERVICE))
}

// ============================================================================
// System Keychain Implementation
// ============================================================================

/// Implementation over the platform keychain via the `keyring` crate.
#[derive(Debug, Clone)]
pub struct SystemKeychain {
    service: String,
}

impl SystemKeychain {
    /// Creates a keychain view scoped to `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The service name entries are stored under.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Runs `op` against the entry for `key` on the blocking pool.
    ///
    /// Platform backends may block on IPC or a user prompt.
    async fn with_entry<T, F>(&self, key: &str, op: F) -> Result<T, KeychainError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, KeychainError> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry =
                Entry::new(&service, &key).map_err(|e| KeychainError::Platform(e.to_string()))?;
            op(entry)
        })
        .await
        .map_err(|e| KeychainError::Other(format!("keychain task failed: {e}")))?
    }
}

impl Default for SystemKeychain {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

#[async_trait]
impl KeychainApi for SystemKeychain {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        debug!(service = %self.service, key = %key, "Getting credential from keychain");

        let result = self
            .with_entry(key, |entry| match entry.get_password() {
                Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await;
        match &result {
            Ok(None) => debug!(service = %self.service, key = %key, "Credential not found"),
            Err(e) => {
                warn!(service = %self.service, key = %key, error = %e, "Failed to get credential");
            }
            Ok(Some(_)) => {}
        }
        result
    }

    async fn set(&self, key: &str, secret: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service, key = %key, "Setting credential in keychain");

        let secret = secret.to_string();
        self.with_entry(key, move |entry| {
            entry.set_password(&secret).map_err(KeychainError::from)
        })
        .await
        .inspect_err(|e| {
            warn!(service = %self.service, key = %key, error = %e, "Failed to set credential");
        })
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service, key = %key, "Deleting credential from keychain");

        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await
        .inspect_err(|e| {
            warn!(service = %self.service, key = %key, error = %e, "Failed to delete credential");
        })
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// Map-backed keychain.
///
/// Clones share the same entries. [`MemoryKeychain::failing`] builds one
/// whose writes always fail, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeychain {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: bool,
}

impl MemoryKeychain {
    /// Creates an empty keychain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a keychain whose `set` and `delete` always fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeychainApi for MemoryKeychain {
    async fn get(&self, key: &str) -> Result<Option<String>, KeychainError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).filter(|v| !v.is_empty()).cloned())
    }

    async fn set(&self, key: &str, secret: &str) -> Result<(), KeychainError> {
        if self.fail_writes {
            return Err(KeychainError::Unavailable("write refused".to_string()));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), secret.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KeychainError> {
        if self.fail_writes {
            return Err(KeychainError::Unavailable("write refused".to_string()));
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
