//! The local login server.
//!
//! Routes:
//!
//! | Path | Method | Purpose |
//! |---|---|---|
//! | `/` | GET | Setup page |
//! | `/validate` | POST | Test a pasted key (CSRF header required) |
//! | `/submit` | POST | Validate and store a pasted key (CSRF header required) |
//! | `/success` | GET | Final page; posts `/complete` |
//! | `/complete` | POST | Hand the stored key to the waiting command |
//! | `/callback` | GET, POST | Console redirect target |

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use notte_fetch::{
    API_KEY_ENTRY, FetchError, KeychainApi, NotteClient, RequestContext, RetryConfig,
};
use rand::RngCore;
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::open_browser;
use crate::error::LoginError;
use crate::templates::{self, CALLBACK_PAGE, SETUP_PAGE, SUCCESS_PAGE};

/// Header carrying the CSRF token on `/validate` and `/submit`.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Overall time a user gets to finish logging in.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Deadline for the health request that vets a candidate key.
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for open connections.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Options and Result
// ============================================================================

/// Settings for one login attempt.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// API base URL used to validate keys.
    pub api_url: String,
    /// Console base URL for the deep link.
    pub console_url: String,
    /// Whether to launch the browser on start.
    pub open_browser: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            api_url: notte_fetch::DEFAULT_BASE_URL.to_string(),
            console_url: "https://console.notte.cc".to_string(),
            open_browser: true,
        }
    }
}

/// Outcome of a completed login.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginResult {
    /// The key now stored in the keychain.
    pub api_key: String,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Shared State
// ============================================================================

struct ServerState {
    csrf_token: String,
    oauth_state: String,
    console_auth_url: String,
    api_url: String,
    keychain: Arc<dyn KeychainApi>,
    pending: Mutex<Option<LoginResult>>,
    result_tx: mpsc::Sender<LoginResult>,
    shutdown: CancellationToken,
}

/// Which endpoint is asking, since they answer failures differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Paste,
    Callback,
}

impl Flow {
    fn rejected_key_status(self) -> StatusCode {
        match self {
            Flow::Paste => StatusCode::OK,
            Flow::Callback => StatusCode::BAD_REQUEST,
        }
    }

    fn upstream_failure_status(self) -> StatusCode {
        match self {
            Flow::Paste => StatusCode::OK,
            Flow::Callback => StatusCode::BAD_GATEWAY,
        }
    }

    fn save_failure_status(self) -> StatusCode {
        match self {
            Flow::Paste => StatusCode::OK,
            Flow::Callback => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// A bound, not yet running, login server.
pub struct LoginServer {
    listener: TcpListener,
    state: Arc<ServerState>,
    result_rx: mpsc::Receiver<LoginResult>,
    base_url: String,
    open_browser: bool,
}

impl LoginServer {
    /// Binds `127.0.0.1` on an ephemeral port and mints fresh CSRF and state
    /// values.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Bind`] when the listener cannot be created.
    pub async fn bind(
        keychain: Arc<dyn KeychainApi>,
        options: LoginOptions,
    ) -> Result<Self, LoginError> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .map_err(LoginError::Bind)?;
        let port = listener.local_addr().map_err(LoginError::Bind)?.port();
        let base_url = format!("http://127.0.0.1:{port}");

        let oauth_state = random_token();
        let console_auth_url = console_auth_url(&options.console_url, &base_url, &oauth_state);
        let (result_tx, result_rx) = mpsc::channel(1);

        debug!(base_url = %base_url, "Login server bound");

        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                csrf_token: random_token(),
                oauth_state,
                console_auth_url,
                api_url: options.api_url,
                keychain,
                pending: Mutex::new(None),
                result_tx,
                shutdown: CancellationToken::new(),
            }),
            result_rx,
            base_url,
            open_browser: options.open_browser,
        })
    }

    /// `http://127.0.0.1:<port>`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token the setup page must echo in the CSRF header.
    pub fn csrf_token(&self) -> &str {
        &self.state.csrf_token
    }

    /// State value the console must hand back on `/callback`.
    pub fn oauth_state(&self) -> &str {
        &self.state.oauth_state
    }

    /// Deep link into the console's CLI auth page.
    pub fn console_auth_url(&self) -> &str {
        &self.state.console_auth_url
    }

    /// Serves until a key is stored and confirmed, `/complete` is hit, or
    /// `ctx` ends. The server is shut down before returning.
    ///
    /// # Errors
    ///
    /// - [`LoginError::Cancelled`] when `/complete` arrives with nothing stored
    /// - [`LoginError::Interrupted`] when `ctx` is cancelled or times out
    /// - [`LoginError::Serve`] when the HTTP server fails
    pub async fn run(self, ctx: &RequestContext) -> Result<LoginResult, LoginError> {
        let Self {
            listener,
            state,
            mut result_rx,
            base_url,
            open_browser: launch,
        } = self;

        let stop = CancellationToken::new();
        let app = router(state.clone());
        let mut server = tokio::spawn({
            let stop = stop.clone();
            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(stop.cancelled_owned())
                    .await
            }
        });

        if launch {
            let url = base_url.clone();
            tokio::task::spawn_blocking(move || {
                let _ = open_browser(&url);
            });
        }

        info!(base_url = %base_url, "Waiting for browser login");

        let outcome = tokio::select! {
            Some(result) = result_rx.recv() => Ok(result),
            () = state.shutdown.cancelled() => {
                let pending = state.pending.lock().await.clone();
                match result_rx.try_recv().ok().or(pending) {
                    Some(result) => Ok(result),
                    None => Err(LoginError::Cancelled),
                }
            }
            err = ctx.done() => Err(LoginError::Interrupted(err)),
            joined = &mut server => {
                let err = match joined {
                    Ok(Err(e)) => e,
                    Ok(Ok(())) => std::io::Error::other("server stopped unexpectedly"),
                    Err(e) => std::io::Error::other(e),
                };
                return Err(LoginError::Serve(err));
            }
        };

        stop.cancel();
        match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
            Ok(Ok(Ok(()))) => debug!("Login server stopped"),
            Ok(Ok(Err(e))) => warn!(error = %e, "Login server exited with an error"),
            Ok(Err(e)) => warn!(error = %e, "Login server task failed"),
            Err(_) => warn!("Login server did not stop in time"),
        }

        outcome
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(handle_setup))
        .route("/validate", post(handle_validate))
        .route("/submit", post(handle_submit))
        .route("/success", get(handle_success))
        .route("/complete", post(handle_complete))
        .route("/callback", get(handle_callback_page).post(handle_callback))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
struct KeyRequest {
    #[serde(default)]
    api_key: String,
}

#[derive(Deserialize)]
struct CallbackRequest {
    #[serde(default)]
    token: String,
    #[serde(default)]
    state: String,
}

async fn handle_setup(State(state): State<Arc<ServerState>>) -> Html<String> {
    Html(templates::render(
        SETUP_PAGE,
        &[
            ("csrf_token", &state.csrf_token),
            ("console_auth_url", &state.console_auth_url),
        ],
    ))
}

async fn handle_success() -> Html<String> {
    Html(templates::render(SUCCESS_PAGE, &[]))
}

async fn handle_callback_page(State(state): State<Arc<ServerState>>) -> Html<String> {
    Html(templates::render(
        CALLBACK_PAGE,
        &[("expected_state", &state.oauth_state)],
    ))
}

async fn handle_validate(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = check_csrf(&state, &headers) {
        return rejection;
    }
    let Ok(request) = serde_json::from_slice::<KeyRequest>(&body) else {
        return invalid_body();
    };

    match validate_key(&state.api_url, &request.api_key, Flow::Paste).await {
        Ok(()) => json_response(
            StatusCode::OK,
            json!({"success": true, "message": "Connection successful"}),
        ),
        Err(rejection) => rejection,
    }
}

async fn handle_submit(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = check_csrf(&state, &headers) {
        return rejection;
    }
    let Ok(request) = serde_json::from_slice::<KeyRequest>(&body) else {
        return invalid_body();
    };

    accept_key(&state, request.api_key, Flow::Paste).await
}

async fn handle_callback(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let Ok(request) = serde_json::from_slice::<CallbackRequest>(&body) else {
        return invalid_body();
    };

    if !constant_time_eq(request.state.as_bytes(), state.oauth_state.as_bytes()) {
        warn!("Callback state mismatch");
        return failure(StatusCode::FORBIDDEN, "Invalid state parameter");
    }
    if request.token.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "No token received");
    }

    accept_key(&state, request.token, Flow::Callback).await
}

async fn handle_complete(State(state): State<Arc<ServerState>>) -> Response {
    let pending = state.pending.lock().await.clone();
    if let Some(result) = pending {
        if state.result_tx.try_send(result).is_err() {
            debug!("Login result already delivered");
        }
    }
    state.shutdown.cancel();
    json_response(StatusCode::OK, json!({"success": true}))
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates `api_key`, stores it in the keychain and arms the result.
async fn accept_key(state: &ServerState, api_key: String, flow: Flow) -> Response {
    if let Err(rejection) = validate_key(&state.api_url, &api_key, flow).await {
        return rejection;
    }

    let mut pending = state.pending.lock().await;
    if let Err(e) = state.keychain.set(API_KEY_ENTRY, &api_key).await {
        warn!(error = %e, "Failed to store API key");
        return failure(
            flow.save_failure_status(),
            &format!("Failed to save credentials: {e}"),
        );
    }
    *pending = Some(LoginResult { api_key });
    info!("API key validated and stored");

    json_response(StatusCode::OK, json!({"success": true}))
}

/// Calls `GET /health` with the candidate key.
async fn validate_key(api_url: &str, api_key: &str, flow: Flow) -> Result<(), Response> {
    let client = NotteClient::builder(api_key)
        .base_url(api_url)
        .retry(RetryConfig::no_retry())
        .build()
        .map_err(|e| failure(flow.rejected_key_status(), &format!("Invalid API key: {e}")))?;

    let ctx = RequestContext::with_timeout(VALIDATION_TIMEOUT);
    let response = client.health(&ctx).await.map_err(|e| {
        debug!(error = %e, "Key validation request failed");
        failure(
            flow.upstream_failure_status(),
            &format!("Connection failed: {}", connection_error(&e)),
        )
    })?;

    if !response.status.is_success() {
        debug!(status = %response.status, "Key rejected by API");
        return Err(failure(
            flow.upstream_failure_status(),
            &format!("API error: {}", response.status),
        ));
    }
    Ok(())
}

fn connection_error(err: &FetchError) -> String {
    match err {
        FetchError::Http(e) => e.to_string(),
        other => other.to_string(),
    }
}

fn check_csrf(state: &ServerState, headers: &HeaderMap) -> Result<(), Response> {
    let provided = headers
        .get(CSRF_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if constant_time_eq(provided, state.csrf_token.as_bytes()) {
        Ok(())
    } else {
        warn!("Rejected request with invalid CSRF token");
        Err((StatusCode::FORBIDDEN, "Invalid CSRF token").into_response())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

fn invalid_body() -> Response {
    failure(StatusCode::BAD_REQUEST, "Invalid request body")
}

fn failure(status: StatusCode, message: &str) -> Response {
    json_response(status, json!({"success": false, "error": message}))
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(body),
    )
        .into_response()
}

/// 32 random bytes as 64 lowercase hex characters.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ============================================================================
// Console URLs
// ============================================================================

/// Builds `<console>/auth/cli?callback=<base>/callback&state=<state>`.
///
/// Falls back to the console's API key page when the console URL does not
/// parse.
pub fn console_auth_url(console_url: &str, base_url: &str, state: &str) -> String {
    let console = console_url.trim_end_matches('/');
    match Url::parse(&format!("{console}/auth/cli")) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("callback", &format!("{base_url}/callback"))
                .append_pair("state", state);
            url.into()
        }
        Err(_) => format!("{console}/apikeys"),
    }
}

/// Accepts only absolute `https` console URLs.
///
/// # Errors
///
/// Returns [`LoginError::InvalidConsoleUrl`] for anything else.
pub fn validate_console_url(raw: &str) -> Result<Url, LoginError> {
    let invalid = |reason| LoginError::InvalidConsoleUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|_| invalid("not a valid URL"))?;
    if url.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_shape() {
        let a = random_token();
        let b = random_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_console_auth_url() {
        let url = console_auth_url(
            "https://console.notte.cc/",
            "http://127.0.0.1:4242",
            "abc",
        );
        assert_eq!(
            url,
            "https://console.notte.cc/auth/cli?callback=http%3A%2F%2F127.0.0.1%3A4242%2Fcallback&state=abc"
        );
    }

    #[test]
    fn test_console_auth_url_fallback() {
        assert_eq!(
            console_auth_url("not a url", "http://127.0.0.1:1", "s"),
            "not a url/apikeys"
        );
    }

    #[test]
    fn test_validate_console_url() {
        assert!(validate_console_url("https://console.notte.cc").is_ok());
        assert!(validate_console_url("http://console.notte.cc").is_err());
        assert!(validate_console_url("HTTPS://console.notte.cc").is_ok());
        assert!(validate_console_url("ftp://console.notte.cc").is_err());
        assert!(validate_console_url("console.notte.cc").is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"tokem"));
        assert!(!constant_time_eq(b"", b"token"));
    }

    #[test]
    fn test_flow_statuses() {
        assert_eq!(Flow::Paste.upstream_failure_status(), StatusCode::OK);
        assert_eq!(Flow::Callback.upstream_failure_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            Flow::Callback.save_failure_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
