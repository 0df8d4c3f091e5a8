//! Host APIs used by the Notte client.
//!
//! - [`keychain`] - Secure credential storage (system keychain or in-memory)

pub mod keychain;

pub use keychain::{KeychainApi, MemoryKeychain, SystemKeychain};
