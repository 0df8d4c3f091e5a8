// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Notte Auth
//!
//! Browser-assisted login for the Notte CLI.
//!
//! [`LoginServer`] binds to `127.0.0.1` on an ephemeral port and serves a
//! setup page. The user either pastes an API key or follows a deep link to
//! the console, which hands the key back through `/callback`. Every key is
//! checked against the API's health endpoint before it is written to the
//! keychain.
//!
//! ## Usage
//!
//! ```ignore
//! use notte_auth::{LoginOptions, LoginServer, LOGIN_TIMEOUT};
//! use notte_fetch::{default_keychain, RequestContext};
//!
//! let server = LoginServer::bind(default_keychain(), LoginOptions::default()).await?;
//! println!("visit {}", server.base_url());
//! let result = server.run(&RequestContext::with_timeout(LOGIN_TIMEOUT)).await?;
//! ```

pub mod browser;
pub mod error;
pub mod server;
pub mod templates;

pub use browser::open_browser;
pub use error::LoginError;
pub use server::{
    CSRF_HEADER, LOGIN_TIMEOUT, LoginOptions, LoginResult, LoginServer, console_auth_url,
    validate_console_url,
};
