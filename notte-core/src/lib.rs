// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Notte Core
//!
//! Shared types for the Notte command-line client.
//!
//! This crate has no I/O. It provides:
//!
//! - The API error taxonomy and its parser ([`ApiError`])
//! - A timestamp type tolerant of the formats the API emits ([`FlexibleTime`])
//! - Typed response models ([`models`])
//!
//! ## Key Types
//!
//! ### Errors
//! - [`ApiError`] - Auth, rate-limit, circuit-open and generic API failures
//! - [`AuthReason`] - Why credentials were rejected
//! - [`sanitize_message`] - Cleans server messages for display
//!
//! ### Models
//! - [`ListResponse`] - Paged list envelope
//! - [`SessionResponse`], [`AgentResponse`], [`VaultResponse`], ...

pub mod error;
pub mod models;
pub mod time;

pub use error::{ApiError, AuthReason, DEFAULT_RETRY_AFTER, MAX_MESSAGE_LEN, sanitize_message};
pub use time::FlexibleTime;

pub use models::{
    AgentResponse, AgentStartRequest, ExecutionResponse, FunctionResponse, FunctionRunResponse,
    HealthResponse, ListResponse, PersonaResponse, ProfileResponse, ScrapeResponse,
    SessionResponse, SessionStartRequest, UsageResponse, VaultResponse,
};
