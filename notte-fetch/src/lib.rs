// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Notte Fetch
//!
//! The HTTP side of the Notte CLI.
//!
//! ## Resilience
//!
//! Every API call goes through a [`ResilientTransport`], which:
//!
//! - refuses calls while the [`CircuitBreaker`] is open
//! - sets `Authorization: Bearer <key>`
//! - adds an [`idempotency`] key to mutating requests
//! - retries per [`RetryConfig`] with exponential backoff and jitter
//! - reports the outcome back to the breaker
//!
//! ## Client
//!
//! [`NotteClient`] binds a base URL and key to that stack and offers a
//! request builder; [`RequestContext`] carries deadlines and cancellation.
//!
//! ## Host APIs
//!
//! - [`host::keychain`] - Secure credential storage (system keychain)

pub mod circuit;
pub mod client;
pub mod context;
pub mod error;
pub mod host;
pub mod idempotency;
pub mod retry;
pub mod transport;

// Errors
pub use error::{FetchError, KeychainError};

// Resilience
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock};
pub use retry::RetryConfig;
pub use transport::{
    ApiRequest, ApiResponse, DEFAULT_REQUEST_TIMEOUT, HttpTransport, MultipartFactory,
    ReqwestTransport, RequestBody, ResilientTransport, handle_api_response,
};

// Client
pub use client::{
    DEFAULT_BASE_URL, HEALTH_CHECK_TIMEOUT, NotteClient, NotteClientBuilder, RequestBuilder,
    parse_base_url,
};
pub use context::RequestContext;

// Host APIs
pub use host::keychain::{
    API_KEY_ENTRY, KEYRING_SERVICE, KeychainApi, MemoryKeychain, SystemKeychain,
    default_keychain,
};

// Re-exported for callers building requests and forms.
pub use reqwest::{Method, StatusCode, multipart};
