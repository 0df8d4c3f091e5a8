//! Client for the Notte API.
//!
//! [`NotteClient`] binds a base URL and an API key to a transport stack and
//! exposes a small request builder. Commands use it like this:
//!
//! ```ignore
//! let client = NotteClient::new("sk-...")?;
//! let ctx = RequestContext::with_timeout(Duration::from_secs(30));
//! let sessions: ListResponse<SessionResponse> =
//!     client.get(&["sessions"]).send_json(&ctx).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::circuit::CircuitBreaker;
use crate::context::RequestContext;
use crate::error::FetchError;
use crate::retry::RetryConfig;
use crate::transport::{
    ApiRequest, ApiResponse, HttpTransport, MultipartFactory, ReqwestTransport, RequestBody,
    ResilientTransport,
};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.notte.cc";

/// Deadline used when validating a key against `/health`.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Client
// ============================================================================

/// Authenticated handle on the Notte API.
#[derive(Clone)]
pub struct NotteClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for NotteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotteClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl NotteClient {
    /// Creates a client for the production API with default resilience.
    ///
    /// # Errors
    ///
    /// Fails when the key is empty or the HTTP stack cannot be initialized.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::builder(api_key).build()
    }

    /// Starts configuring a client.
    pub fn builder(api_key: impl Into<String>) -> NotteClientBuilder {
        NotteClientBuilder {
            api_key: api_key.into(),
            base_url: None,
            retry: RetryConfig::default(),
            breaker: None,
            transport: None,
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves path segments against the base URL. Segments are
    /// percent-encoded, so ids can be passed verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] for bases that cannot carry a path.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request.
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            method,
            url: self.url_for(segments),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            error: None,
        }
    }

    /// Starts a GET request.
    pub fn get(&self, segments: &[&str]) -> RequestBuilder<'_> {
        self.request(Method::GET, segments)
    }

    /// Starts a POST request.
    pub fn post(&self, segments: &[&str]) -> RequestBuilder<'_> {
        self.request(Method::POST, segments)
    }

    /// Starts a PUT request.
    pub fn put(&self, segments: &[&str]) -> RequestBuilder<'_> {
        self.request(Method::PUT, segments)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, segments: &[&str]) -> RequestBuilder<'_> {
        self.request(Method::PATCH, segments)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, segments: &[&str]) -> RequestBuilder<'_> {
        self.request(Method::DELETE, segments)
    }

    /// Calls `GET /health` with a 10 second deadline (or the caller's, if
    /// shorter) and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns transport failures and cancellation; error statuses are
    /// returned as responses.
    pub async fn health(&self, ctx: &RequestContext) -> Result<ApiResponse, FetchError> {
        let ctx = ctx.child_with_timeout(HEALTH_CHECK_TIMEOUT);
        self.get(&["health"]).send(&ctx).await
    }

    /// Sends a prepared request through the transport stack.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::round_trip`].
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: ApiRequest,
    ) -> Result<ApiResponse, FetchError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        self.transport.round_trip(ctx, request).await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures a [`NotteClient`].
pub struct NotteClientBuilder {
    api_key: String,
    base_url: Option<String>,
    retry: RetryConfig,
    breaker: Option<Arc<CircuitBreaker>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl NotteClientBuilder {
    /// Overrides the base URL. Empty strings are ignored.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.base_url = Some(url);
        }
        self
    }

    /// Replaces the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Uses a specific circuit breaker.
    pub fn circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Replaces the underlying network transport. The resilience layer is
    /// still added on top.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingApiKey`] for an empty key,
    /// [`FetchError::InvalidUrl`] for a malformed base URL, or the HTTP
    /// stack's initialization error.
    pub fn build(self) -> Result<NotteClient, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let raw = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = parse_base_url(raw)?;

        let inner = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::shared()?),
        };
        let mut resilient = ResilientTransport::new(inner, self.api_key).with_retry(self.retry);
        if let Some(breaker) = self.breaker {
            resilient = resilient.with_circuit_breaker(breaker);
        }

        Ok(NotteClient {
            base_url,
            transport: Arc::new(resilient),
        })
    }
}

/// Parses and checks an API base URL.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] unless the URL is absolute http(s)
/// with a host.
pub fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!(
            "{raw}: expected an http(s) URL with a host"
        )));
    }
    Ok(url)
}

// ============================================================================
// Request Builder
// ============================================================================

/// A request being assembled. Errors are deferred until it is sent.
pub struct RequestBuilder<'a> {
    client: &'a NotteClient,
    method: Method,
    url: Result<Url, FetchError>,
    headers: HeaderMap,
    body: RequestBody,
    error: Option<FetchError>,
}

impl RequestBuilder<'_> {
    /// Appends a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        if let Ok(url) = &mut self.url {
            url.query_pairs_mut().append_pair(key, &value.to_string());
        }
        self
    }

    /// Appends a query parameter when `value` is present.
    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Sets a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.error = Some(FetchError::InvalidRequest(e.to_string())),
        }
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.body = RequestBody::Bytes(Bytes::from(bytes));
            }
            Err(e) => self.error = Some(FetchError::Json(e)),
        }
        self
    }

    /// Sends pre-encoded JSON.
    pub fn raw_json(mut self, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// Sends a multipart form rebuilt for each attempt.
    pub fn multipart(mut self, factory: MultipartFactory) -> Self {
        self.body = RequestBody::Multipart(factory);
        self
    }

    fn into_request(self) -> Result<ApiRequest, FetchError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(ApiRequest {
            method: self.method,
            url: self.url?,
            headers: self.headers,
            body: self.body,
        })
    }

    /// Sends the request and returns the raw response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns builder errors, transport failures and cancellation.
    pub async fn send(self, ctx: &RequestContext) -> Result<ApiResponse, FetchError> {
        let client = self.client;
        let request = self.into_request()?;
        client.execute(ctx, request).await
    }

    /// Sends the request and converts non-2xx statuses into errors.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`FetchError::Api`] for error statuses.
    pub async fn send_checked(self, ctx: &RequestContext) -> Result<ApiResponse, FetchError> {
        Ok(self.send(ctx).await?.error_for_status()?)
    }

    /// Sends the request and decodes a successful JSON body.
    ///
    /// # Errors
    ///
    /// As [`send_checked`](Self::send_checked), plus decoding failures.
    pub async fn send_json<T: DeserializeOwned>(self, ctx: &RequestContext) -> Result<T, FetchError> {
        self.send_checked(ctx).await?.json()
    }
}
