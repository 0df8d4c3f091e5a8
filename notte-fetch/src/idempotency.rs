//! Idempotency keys for mutating requests.
//!
//! The API de-duplicates writes that carry the same `Idempotency-Key`, so a
//! retried POST cannot create a second resource.

use rand::RngCore;
use rand::rngs::OsRng;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};

/// Header carrying the key (`Idempotency-Key` on the wire; header names are
/// case-insensitive).
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Number of random bytes in a key (rendered as twice as many hex chars).
const KEY_BYTES: usize = 32;

/// Returns a fresh 64-character lowercase hex key from the OS CSPRNG.
pub fn generate() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// True for POST, PUT, PATCH and DELETE.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// True for GET, HEAD and OPTIONS, the methods that are safe to resend.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Adds an idempotency key to `headers` for mutating methods.
///
/// A key already set by the caller is left untouched. Returns true when a new
/// key was inserted.
pub fn attach(method: &Method, headers: &mut HeaderMap) -> bool {
    if !is_mutating(method) || headers.contains_key(IDEMPOTENCY_KEY_HEADER) {
        return false;
    }
    match HeaderValue::from_str(&generate()) {
        Ok(value) => {
            headers.insert(IDEMPOTENCY_KEY_HEADER, value);
            true
        }
        Err(_) => false,
    }
}
