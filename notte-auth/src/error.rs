//! Login error types.

use notte_fetch::FetchError;
use thiserror::Error;

/// Errors that end a login attempt.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The local listener could not be bound.
    #[error("failed to start server: {0}")]
    Bind(#[source] std::io::Error),

    /// The HTTP server stopped unexpectedly.
    #[error("login server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// The flow finished without a stored key.
    #[error("setup cancelled")]
    Cancelled,

    /// The caller's context was cancelled or timed out.
    #[error("login interrupted: {0}")]
    Interrupted(#[source] FetchError),

    /// The console URL is not an https URL.
    #[error("invalid console URL {url:?}: {reason}")]
    InvalidConsoleUrl {
        /// The rejected value.
        url: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
