//! Error taxonomy for responses returned by the Notte API.
//!
//! Every failed API call collapses into one of four kinds:
//!
//! - [`ApiError::Auth`] for 401/403 responses
//! - [`ApiError::RateLimit`] for 429 responses, carrying the `Retry-After` delay
//! - [`ApiError::CircuitOpen`] when the client refused to send the request
//! - [`ApiError::Api`] for everything else
//!
//! [`ApiError::from_response`] builds the right kind from a status code and
//! the already-buffered response body.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of characters kept by [`sanitize_message`].
pub const MAX_MESSAGE_LEN: usize = 500;

/// Retry delay used when a 429 response has no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

// ============================================================================
// Error Kinds
// ============================================================================

/// Why the API rejected our credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthReason {
    /// The API key is missing, malformed or revoked (HTTP 401).
    Invalid,
    /// The key is valid but not allowed to perform the operation (HTTP 403).
    Forbidden,
}

impl AuthReason {
    /// Short tag used in JSON output (`invalid` / `forbidden`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for AuthReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid API key"),
            Self::Forbidden => write!(f, "access forbidden"),
        }
    }
}

/// A failed call against the Notte API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Credentials were rejected.
    #[error("authentication failed: {reason}")]
    Auth {
        /// Rejection reason.
        reason: AuthReason,
    },

    /// The server is throttling us.
    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimit {
        /// How long the server asked us to wait.
        retry_after: Duration,
    },

    /// The client-side circuit breaker refused the call.
    #[error(
        "service temporarily unavailable (circuit breaker open until {}), please retry later",
        .open_until.to_rfc3339_opts(SecondsFormat::Secs, true)
    )]
    CircuitOpen {
        /// Earliest instant a new request will be attempted.
        open_until: DateTime<Utc>,
    },

    /// Any other non-2xx response.
    #[error("{}", api_message(*.status, .message))]
    Api {
        /// HTTP status, absent when there was no response at all.
        status: Option<u16>,
        /// Machine-readable error code, or the HTTP status text.
        code: String,
        /// Sanitized human-readable message.
        message: String,
        /// Component that raised the error server-side, when reported.
        origin: Option<String>,
    },
}

fn api_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("API error ({status}): {message}"),
        None => format!("API error: {message}"),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Nested envelope: `{"error": {"code": .., "message": .., "source": ..}}`.
#[derive(Debug, Default, Deserialize)]
struct NestedError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// Union of the two error shapes the API emits.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<NestedError>,
    /// Flat shape used by validation errors.
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Builds the error for a request that produced no response at all.
    pub fn nil_response() -> Self {
        Self::Api {
            status: None,
            code: String::new(),
            message: "nil response".to_string(),
            origin: None,
        }
    }

    /// Classifies a response.
    ///
    /// `status_text` is the canonical reason phrase for `status` (e.g.
    /// `"Bad Request"`) and is used as the code when the body carries none.
    /// `retry_after` is the raw `Retry-After` header value, if any.
    ///
    /// Returns `None` for 2xx statuses.
    pub fn from_response(
        status: u16,
        status_text: &str,
        retry_after: Option<&str>,
        body: &[u8],
    ) -> Option<Self> {
        if (200..300).contains(&status) {
            return None;
        }

        match status {
            401 => {
                return Some(Self::Auth {
                    reason: AuthReason::Invalid,
                });
            }
            403 => {
                return Some(Self::Auth {
                    reason: AuthReason::Forbidden,
                });
            }
            429 => {
                return Some(Self::RateLimit {
                    retry_after: parse_retry_after(retry_after),
                });
            }
            _ => {}
        }

        let Ok(envelope) = serde_json::from_slice::<Option<ErrorEnvelope>>(body) else {
            return Some(Self::Api {
                status: Some(status),
                code: status_text.to_string(),
                message: sanitize_message(&String::from_utf8_lossy(body)),
                origin: None,
            });
        };
        let envelope = envelope.unwrap_or_default();
        let nested = envelope.error.unwrap_or_default();

        let message = nested
            .message
            .filter(|m| !m.is_empty())
            .or(envelope.message)
            .unwrap_or_default();
        let code = nested
            .code
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| status_text.to_string());

        Some(Self::Api {
            status: Some(status),
            code,
            message: sanitize_message(&message),
            origin: nested.source.filter(|s| !s.is_empty()),
        })
    }

    /// HTTP status associated with this error, when one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth {
                reason: AuthReason::Invalid,
            } => Some(401),
            Self::Auth {
                reason: AuthReason::Forbidden,
            } => Some(403),
            Self::RateLimit { .. } => Some(429),
            Self::CircuitOpen { .. } => None,
            Self::Api { status, .. } => *status,
        }
    }

    /// Message without the kind prefix, suitable for `Error <status>: <msg>`.
    pub fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn parse_retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

/// Cleans a server-provided message for display.
///
/// Control characters other than `\n` are removed, then the result is cut to
/// [`MAX_MESSAGE_LEN`] characters with a `...` suffix. Applying it twice is
/// the same as applying it once.
pub fn sanitize_message(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .filter(|c| *c == '\n' || u32::from(*c) >= 0x20)
        .collect();

    if cleaned.chars().count() <= MAX_MESSAGE_LEN {
        return cleaned;
    }

    let mut truncated: String = cleaned.chars().take(MAX_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(status: u16, text: &str, retry_after: Option<&str>, body: &str) -> ApiError {
        ApiError::from_response(status, text, retry_after, body.as_bytes()).unwrap()
    }

    #[test]
    fn test_success_is_not_an_error() {
        assert!(ApiError::from_response(200, "OK", None, b"{}").is_none());
        assert!(ApiError::from_response(204, "No Content", None, b"").is_none());
    }

    #[test]
    fn test_nested_error_shape() {
        let err = parse(
            400,
            "Bad Request",
            None,
            r#"{"error": {"code": "INVALID_REQUEST", "message": "Invalid session ID format", "source": "sessions"}}"#,
        );
        assert_eq!(
            err,
            ApiError::Api {
                status: Some(400),
                code: "INVALID_REQUEST".into(),
                message: "Invalid session ID format".into(),
                origin: Some("sessions".into()),
            }
        );
        assert_eq!(err.to_string(), "API error (400): Invalid session ID format");
    }

    #[test]
    fn test_flat_error_shape_uses_status_text_as_code() {
        let err = parse(
            422,
            "Unprocessable Entity",
            None,
            r#"{"message": "field required", "status_code": 422}"#,
        );
        let ApiError::Api { code, message, .. } = err else {
            panic!("expected generic API error");
        };
        assert_eq!(code, "Unprocessable Entity");
        assert_eq!(message, "field required");
    }

    #[test]
    fn test_auth_statuses() {
        let invalid = parse(401, "Unauthorized", None, r#"{"error": {"message": "bad key"}}"#);
        assert_eq!(
            invalid,
            ApiError::Auth {
                reason: AuthReason::Invalid
            }
        );
        assert_eq!(invalid.status_code(), Some(401));

        let forbidden = parse(403, "Forbidden", None, "");
        assert_eq!(
            forbidden,
            ApiError::Auth {
                reason: AuthReason::Forbidden
            }
        );
        assert!(forbidden.to_string().contains("forbidden"));
    }

    #[test]
    fn test_rate_limit_retry_after() {
        let err = parse(429, "Too Many Requests", Some("30"), r#"{"error": {"code": "RATE_LIMITED"}}"#);
        assert_eq!(
            err,
            ApiError::RateLimit {
                retry_after: Duration::from_secs(30)
            }
        );
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_rate_limit_defaults_to_sixty_seconds() {
        for header in [None, Some("soon"), Some("-4"), Some("")] {
            let err = parse(429, "Too Many Requests", header, "");
            assert_eq!(
                err,
                ApiError::RateLimit {
                    retry_after: DEFAULT_RETRY_AFTER
                }
            );
        }
    }

    #[test]
    fn test_malformed_json_falls_back_to_body() {
        let err = parse(502, "Bad Gateway", None, "<html>upstream\x07 down</html>");
        assert_eq!(
            err,
            ApiError::Api {
                status: Some(502),
                code: "Bad Gateway".into(),
                message: "<html>upstream down</html>".into(),
                origin: None,
            }
        );
    }

    #[test]
    fn test_nil_response_has_no_status() {
        let err = ApiError::nil_response();
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "API error: nil response");
    }

    #[test]
    fn test_circuit_open_message_mentions_instant() {
        let open_until = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let err = ApiError::CircuitOpen { open_until };
        let msg = err.to_string();
        assert!(msg.contains("temporarily unavailable"));
        assert!(msg.contains("2026-01-02T03:04:05Z"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_message("a\tb\r\nc\x00d\x1b"), "ab\ncd");
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 20);
        let out = sanitize_message(&long);
        assert_eq!(out.chars().count(), MAX_MESSAGE_LEN + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            String::new(),
            "plain".to_string(),
            "ctrl\x01\x02\nline".to_string(),
            "é".repeat(MAX_MESSAGE_LEN * 2),
            format!("{}\x07{}", "a".repeat(498), "b".repeat(10)),
        ];
        for input in inputs {
            let once = sanitize_message(&input);
            assert_eq!(sanitize_message(&once), once);
            assert!(once.chars().count() <= MAX_MESSAGE_LEN + 3);
            assert!(once.bytes().all(|b| b >= 0x20 || b == b'\n'));
        }
    }
}
