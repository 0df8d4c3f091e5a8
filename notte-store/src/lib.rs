// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Notte Store
//!
//! Local state for the Notte CLI.
//!
//! This crate provides:
//!
//! - **Config**: `~/.notte/cli/config.json` with the API URL and, as a last
//!   resort, the API key
//! - **Credentials**: the environment → keychain → config resolution chain
//! - **Persistence**: JSON file helpers with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use notte_fetch::default_keychain;
//! use notte_store::{Config, CredentialResolver};
//!
//! let resolver = CredentialResolver::new(default_keychain());
//! let credential = resolver.resolve().await?;
//! println!("using key from {}", credential.source);
//! ```

pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod persistence;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_CONSOLE_URL, ENV_API_URL, ENV_CONSOLE_URL, ENV_SESSION_ID,
    console_url,
};
pub use credentials::{
    Credential, CredentialResolver, CredentialSource, ENV_API_KEY, mask_api_key,
};
pub use env::{EnvSource, ProcessEnv};
pub use error::{NO_API_KEY_MESSAGE, StoreError};
pub use persistence::{
    default_config_dir, default_config_path, load_json, load_json_or_default, remove_file,
    save_json,
};

#[cfg(test)]
mod persistence_tests;
