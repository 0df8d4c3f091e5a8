//! Integration tests for the public error surface.

use std::time::Duration;

use notte_core::{ApiError, AuthReason, MAX_MESSAGE_LEN};

#[test]
fn test_every_status_class_maps_to_one_kind() {
    let cases: &[(u16, &str)] = &[
        (400, "Bad Request"),
        (404, "Not Found"),
        (409, "Conflict"),
        (500, "Internal Server Error"),
        (503, "Service Unavailable"),
    ];
    for (status, text) in cases {
        let err = ApiError::from_response(*status, text, None, b"{}").unwrap();
        match err {
            ApiError::Api {
                status: Some(s),
                ref code,
                ..
            } => {
                assert_eq!(s, *status);
                assert_eq!(code, text);
            }
            other => panic!("unexpected kind for {status}: {other:?}"),
        }
    }
}

#[test]
fn test_long_bodies_are_truncated() {
    let body = format!(r#"{{"error": {{"message": "{}"}}}}"#, "z".repeat(2_000));
    let err = ApiError::from_response(500, "Internal Server Error", None, body.as_bytes()).unwrap();
    let ApiError::Api { message, .. } = err else {
        panic!("expected generic API error");
    };
    assert_eq!(message.len(), MAX_MESSAGE_LEN + 3);
}

#[test]
fn test_detail_strips_kind_prefix() {
    let err = ApiError::from_response(
        404,
        "Not Found",
        None,
        br#"{"error": {"code": "NOT_FOUND", "message": "session not found"}}"#,
    )
    .unwrap();
    assert_eq!(err.detail(), "session not found");
    assert_eq!(err.status_code(), Some(404));

    let auth = ApiError::Auth {
        reason: AuthReason::Invalid,
    };
    assert_eq!(auth.detail(), "authentication failed: invalid API key");

    let limited = ApiError::RateLimit {
        retry_after: Duration::from_secs(5),
    };
    assert_eq!(limited.to_string(), "rate limit exceeded, retry after 5s");
}
