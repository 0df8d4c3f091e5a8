//! Store error types.

use notte_fetch::KeychainError;
use thiserror::Error;

/// Message shown when no credential source yields a key.
pub const NO_API_KEY_MESSAGE: &str =
    "no API key found. Run 'notte auth login' or set NOTTE_API_KEY";

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// None of the credential sources produced a key.
    #[error("{}", NO_API_KEY_MESSAGE)]
    NoApiKey,

    /// The user's home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,

    /// Keychain access failed.
    #[error("keychain error: {0}")]
    Keychain(#[from] KeychainError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true when the error means a file simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
