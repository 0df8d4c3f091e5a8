//! HTTP transports.
//!
//! [`HttpTransport`] is the seam every request goes through. Two
//! implementations ship here:
//!
//! - [`ReqwestTransport`] sends bytes over a shared connection pool
//! - [`ResilientTransport`] wraps another transport and adds bearer auth,
//!   idempotency keys, retries and the circuit breaker
//!
//! Tests substitute their own transports to script responses.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use notte_core::ApiError;

use crate::circuit::CircuitBreaker;
use crate::context::RequestContext;
use crate::error::FetchError;
use crate::idempotency;
use crate::retry::RetryConfig;

/// Overall timeout applied by the shared HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Idle connections kept per host.
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// How long an idle pooled connection is kept.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// User agent string for the CLI.
const USER_AGENT: &str = concat!("notte-cli/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request & Response
// ============================================================================

/// Produces a fresh multipart form for every attempt.
///
/// Forms are consumed when sent, so retries need a way to rebuild them.
#[derive(Clone)]
pub struct MultipartFactory(Arc<dyn Fn() -> reqwest::multipart::Form + Send + Sync>);

impl MultipartFactory {
    /// Wraps a form builder.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> reqwest::multipart::Form + Send + Sync + 'static,
    {
        Self(Arc::new(build))
    }

    /// Builds a new form.
    pub fn build(&self) -> reqwest::multipart::Form {
        (self.0)()
    }
}

impl fmt::Debug for MultipartFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MultipartFactory(..)")
    }
}

/// A replayable request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Buffered bytes. The content type travels in the request headers.
    Bytes(Bytes),
    /// A multipart form rebuilt per attempt.
    Multipart(MultipartFactory),
}

/// A request as seen by transports.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    /// Creates a bodiless request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl ApiResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Classifies a non-2xx response. `None` for success.
    pub fn api_error(&self) -> Option<ApiError> {
        let retry_after = self
            .headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok());
        ApiError::from_response(
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            retry_after,
            &self.body,
        )
    }

    /// Passes 2xx responses through and converts everything else.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for non-2xx statuses.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        match self.api_error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Json`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Checks a response that may be missing entirely.
///
/// # Errors
///
/// A missing response yields the generic "nil response" error; non-2xx
/// responses yield their classified error.
pub fn handle_api_response(response: Option<&ApiResponse>) -> Result<(), ApiError> {
    match response {
        None => Err(ApiError::nil_response()),
        Some(response) => response.api_error().map_or(Ok(()), Err),
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends one request and returns the buffered response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs a single round trip.
    ///
    /// HTTP error statuses are returned as `Ok`; only failures to obtain a
    /// response at all are errors.
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: ApiRequest,
    ) -> Result<ApiResponse, FetchError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Transport backed by a `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport with its own pool and the given overall timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()?;
        Ok(Self { client })
    }

    /// Returns a transport over the process-wide pool, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the pool cannot be created.
    pub fn shared() -> Result<Self, FetchError> {
        if let Some(client) = SHARED_CLIENT.get() {
            return Ok(Self {
                client: client.clone(),
            });
        }
        let built = Self::new(DEFAULT_REQUEST_TIMEOUT)?;
        let client = SHARED_CLIENT.get_or_init(|| built.client);
        Ok(Self {
            client: client.clone(),
        })
    }
}

/// Per-attempt timeout: the context's remaining time, never above
/// [`DEFAULT_REQUEST_TIMEOUT`].
fn attempt_timeout(remaining: Option<Duration>) -> Duration {
    remaining.map_or(DEFAULT_REQUEST_TIMEOUT, |left| left.min(DEFAULT_REQUEST_TIMEOUT))
}

/// Seconds from a `Retry-After` header. Absent or non-numeric values yield
/// `None`.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: ApiRequest,
    ) -> Result<ApiResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        builder = builder.timeout(attempt_timeout(ctx.remaining()));
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Multipart(factory) => builder.multipart(factory.build()),
        };

        let response = ctx.run(builder.send()).await??;
        let status = response.status();
        let headers = response.headers().clone();
        let body = ctx.run(response.bytes()).await??;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Resilient Transport
// ============================================================================

/// Adds authentication, idempotency, retries and circuit breaking on top of
/// another transport.
pub struct ResilientTransport {
    inner: Arc<dyn HttpTransport>,
    api_key: String,
    retry: RetryConfig,
    breaker: Arc<CircuitBreaker>,
}

impl fmt::Debug for ResilientTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("retry", &self.retry)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

impl ResilientTransport {
    /// Wraps `inner`, authenticating with `api_key`.
    pub fn new(inner: Arc<dyn HttpTransport>, api_key: impl Into<String>) -> Self {
        Self {
            inner,
            api_key: api_key.into(),
            retry: RetryConfig::default(),
            breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the circuit breaker. Sharing one breaker between transports
    /// makes them fail fast together.
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// The circuit breaker in use.
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// The retry policy in use.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    fn authorize(&self, headers: &mut HeaderMap) -> Result<(), FetchError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| FetchError::InvalidRequest("API key contains invalid characters".into()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    async fn send_with_retry(
        &self,
        ctx: &RequestContext,
        request: &ApiRequest,
    ) -> Result<ApiResponse, FetchError> {
        let mut attempt = 0;
        loop {
            ctx.check()?;

            let mut server_delay = None;
            match self.inner.round_trip(ctx, request.clone()).await {
                Ok(response) => {
                    let status = response.status.as_u16();
                    if !self.retry.should_retry(status, &request.method, attempt) {
                        return Ok(response);
                    }
                    if response.status == StatusCode::TOO_MANY_REQUESTS {
                        server_delay = retry_after(&response.headers);
                    }
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status,
                        attempt,
                        "retrying after error status"
                    );
                }
                Err(err) if err.is_cancellation() => return Err(err),
                Err(err) => {
                    if !self
                        .retry
                        .should_retry_transport_error(&request.method, attempt)
                    {
                        return Err(err);
                    }
                    warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        error = %err,
                        "retrying after transport error"
                    );
                }
            }

            ctx.sleep(self.retry.delay_for(attempt, server_delay)).await?;
            attempt += 1;
        }
    }
}

#[async_trait]
impl HttpTransport for ResilientTransport {
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        mut request: ApiRequest,
    ) -> Result<ApiResponse, FetchError> {
        let permit = BreakerPermit {
            trial: self.breaker.admit()?,
            breaker: &self.breaker,
        };

        self.authorize(&mut request.headers)?;
        idempotency::attach(&request.method, &mut request.headers);

        let result = self.send_with_retry(ctx, &request).await;
        match &result {
            Ok(response) if response.status.is_server_error() => permit.settle(false),
            Ok(_) => permit.settle(true),
            Err(err) if err.is_cancellation() => drop(permit),
            Err(_) => permit.settle(false),
        }
        result
    }
}

/// A call admitted by the breaker. Dropping a trial's permit without an
/// outcome, for example when the caller's future is dropped, releases the
/// trial.
struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
}

impl BreakerPermit<'_> {
    fn settle(self, success: bool) {
        if success {
            self.breaker.record_success();
        } else {
            self.breaker.record_failure();
        }
        std::mem::forget(self);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if self.trial {
            self.breaker.record_abandoned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::circuit::{CircuitBreakerConfig, CircuitState};

    /// Transport replaying a fixed script of outcomes and recording requests.
    struct Scripted {
        script: Mutex<Vec<Result<u16, String>>>,
        headers: HeaderMap,
        seen: Mutex<Vec<ApiRequest>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Result<u16, String>>) -> Arc<Self> {
            Self::with_headers(script, HeaderMap::new())
        }

        fn with_headers(script: Vec<Result<u16, String>>, headers: HeaderMap) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                headers,
                seen: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn round_trip(
            &self,
            _ctx: &RequestContext,
            request: ApiRequest,
        ) -> Result<ApiResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            };
            match next {
                Ok(status) => Ok(ApiResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: self.headers.clone(),
                    body: Bytes::from(format!("status {status}")),
                }),
                Err(msg) => Err(FetchError::InvalidResponse(msg)),
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3)
            .with_initial_backoff(Duration::from_millis(1))
            .with_jitter(false)
    }

    fn resilient(inner: &Arc<Scripted>) -> ResilientTransport {
        ResilientTransport::new(inner.clone(), "test-key").with_retry(fast_retry())
    }

    fn request(method: Method) -> ApiRequest {
        ApiRequest::new(method, Url::parse("https://api.example.test/sessions").unwrap())
    }

    #[tokio::test]
    async fn test_adds_bearer_and_idempotency_headers() {
        let inner = Scripted::new(vec![Ok(200)]);
        let transport = resilient(&inner);

        transport
            .round_trip(&RequestContext::background(), request(Method::POST))
            .await
            .unwrap();

        let seen = inner.seen.lock().unwrap();
        let headers = &seen[0].headers;
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-key");
        assert_eq!(
            headers
                .get(idempotency::IDEMPOTENCY_KEY_HEADER)
                .unwrap()
                .len(),
            64
        );
    }

    #[tokio::test]
    async fn test_get_has_no_idempotency_key() {
        let inner = Scripted::new(vec![Ok(200)]);
        resilient(&inner)
            .round_trip(&RequestContext::background(), request(Method::GET))
            .await
            .unwrap();
        let seen = inner.seen.lock().unwrap();
        assert!(seen[0].headers.get(idempotency::IDEMPOTENCY_KEY_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_retried_post_reuses_its_key() {
        let inner = Scripted::new(vec![Ok(429), Ok(201)]);
        let response = resilient(&inner)
            .round_trip(&RequestContext::background(), request(Method::POST))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::CREATED);

        let seen = inner.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0].headers.get(idempotency::IDEMPOTENCY_KEY_HEADER),
            seen[1].headers.get(idempotency::IDEMPOTENCY_KEY_HEADER)
        );
    }

    #[tokio::test]
    async fn test_transport_errors_retry_for_get_only() {
        let inner = Scripted::new(vec![Err("reset".into()), Ok(200)]);
        let response = resilient(&inner)
            .round_trip(&RequestContext::background(), request(Method::GET))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(inner.calls(), 2);

        let inner = Scripted::new(vec![Err("reset".into()), Ok(200)]);
        let err = resilient(&inner)
            .round_trip(&RequestContext::background(), request(Method::POST))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_response() {
        let inner = Scripted::new(vec![Ok(503)]);
        let response = resilient(&inner)
            .round_trip(&RequestContext::background(), request(Method::GET))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(inner.calls(), 4);
    }

    #[tokio::test]
    async fn test_deadline_stops_backoff() {
        let inner = Scripted::new(vec![Ok(500)]);
        let transport = ResilientTransport::new(inner.clone(), "k").with_retry(
            RetryConfig::new(5)
                .with_initial_backoff(Duration::from_secs(10))
                .with_jitter(false),
        );

        let ctx = RequestContext::with_timeout(Duration::from_millis(30));
        let err = transport
            .round_trip(&ctx, request(Method::GET))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::DeadlineExceeded));
        assert_eq!(inner.calls(), 1);
        assert_eq!(transport.circuit_breaker().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_breaker_records_outcomes() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
        }));
        let inner = Scripted::new(vec![Ok(400), Ok(500), Ok(500), Ok(200)]);
        let transport = ResilientTransport::new(inner.clone(), "k")
            .with_retry(RetryConfig::no_retry())
            .with_circuit_breaker(breaker.clone());
        let ctx = RequestContext::background();

        transport.round_trip(&ctx, request(Method::GET)).await.unwrap();
        assert_eq!(breaker.consecutive_failures(), 0);

        transport.round_trip(&ctx, request(Method::GET)).await.unwrap();
        transport.round_trip(&ctx, request(Method::GET)).await.unwrap();
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));

        let err = transport
            .round_trip(&ctx, request(Method::GET))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Api(ApiError::CircuitOpen { .. })
        ));
        assert_eq!(inner.calls(), 3);
    }

    #[test]
    fn test_handle_api_response() {
        assert_eq!(handle_api_response(None), Err(ApiError::nil_response()));

        let ok = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
        };
        assert!(handle_api_response(Some(&ok)).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        let limited = ApiResponse {
            status: StatusCode::TOO_MANY_REQUESTS,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(
            handle_api_response(Some(&limited)),
            Err(ApiError::RateLimit {
                retry_after: Duration::from_secs(12)
            })
        );
    }

    #[test]
    fn test_status_text_used_as_code() {
        let response = ApiResponse {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"not json"),
        };
        let err = response.error_for_status().unwrap_err();
        let ApiError::Api { code, message, .. } = err else {
            panic!("expected generic API error");
        };
        assert_eq!(code, "Not Found");
        assert_eq!(message, "not json");
    }

    /// Transport whose requests never complete.
    struct Hanging;

    #[async_trait]
    impl HttpTransport for Hanging {
        async fn round_trip(
            &self,
            _ctx: &RequestContext,
            _request: ApiRequest,
        ) -> Result<ApiResponse, FetchError> {
            std::future::pending().await
        }
    }

    fn tripped_breaker() -> Arc<CircuitBreaker> {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::ZERO,
        }));
        breaker.record_failure();
        breaker
    }

    #[tokio::test]
    async fn test_concurrent_callers_wait_for_trial() {
        let breaker = tripped_breaker();
        let transport = ResilientTransport::new(Arc::new(Hanging), "k")
            .with_retry(RetryConfig::no_retry())
            .with_circuit_breaker(breaker.clone());
        let ctx = RequestContext::background();

        let trial = transport.round_trip(&ctx, request(Method::GET));
        let second = async {
            tokio::task::yield_now().await;
            transport.round_trip(&ctx, request(Method::GET)).await
        };
        let outcome = tokio::time::timeout(Duration::from_millis(200), async {
            tokio::select! {
                _ = trial => None,
                result = second => Some(result),
            }
        })
        .await
        .unwrap();

        assert!(matches!(
            outcome,
            Some(Err(FetchError::Api(ApiError::CircuitOpen { .. })))
        ));
    }

    #[tokio::test]
    async fn test_dropped_trial_releases_breaker() {
        let breaker = tripped_breaker();
        let transport = ResilientTransport::new(Arc::new(Hanging), "k")
            .with_retry(RetryConfig::no_retry())
            .with_circuit_breaker(breaker.clone());

        let ctx = RequestContext::background();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), transport.round_trip(&ctx, request(Method::GET)))
                .await;
        assert!(timed_out.is_err());

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(!breaker.trial_in_flight());
        assert!(breaker.allow());
    }

    #[tokio::test]
    async fn test_dropped_closed_call_keeps_other_trial() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::ZERO,
        }));
        let transport = ResilientTransport::new(Arc::new(Hanging), "k")
            .with_retry(RetryConfig::no_retry())
            .with_circuit_breaker(breaker.clone());
        let ctx = RequestContext::background();

        // Admitted while closed, then left hanging.
        let mut closed_call = Box::pin(transport.round_trip(&ctx, request(Method::GET)));
        assert!(poll_once(closed_call.as_mut()).await);

        breaker.record_failure();
        assert_eq!(breaker.admit(), Ok(true));

        drop(closed_call);
        assert!(breaker.trial_in_flight());
    }

    /// Polls a future once; true when it is still pending.
    async fn poll_once<F: std::future::Future>(fut: std::pin::Pin<&mut F>) -> bool {
        let mut fut = Some(fut);
        std::future::poll_fn(|cx| {
            let pending = fut
                .take()
                .is_some_and(|f| f.poll(cx).is_pending());
            std::task::Poll::Ready(pending)
        })
        .await
    }

    #[tokio::test]
    async fn test_cancelled_trial_releases_breaker() {
        let breaker = tripped_breaker();
        let inner = Scripted::new(vec![Ok(200)]);
        let transport = ResilientTransport::new(inner.clone(), "k")
            .with_circuit_breaker(breaker.clone());

        let ctx = RequestContext::background();
        ctx.cancel();
        let err = transport
            .round_trip(&ctx, request(Method::GET))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(inner.calls(), 0);
        assert!(!breaker.trial_in_flight());
        assert_eq!(breaker.consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_waits_for_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
        let inner = Scripted::with_headers(vec![Ok(429), Ok(200)], headers);
        let transport = ResilientTransport::new(inner.clone(), "k").with_retry(
            RetryConfig::new(2)
                .with_initial_backoff(Duration::from_secs(20))
                .with_jitter(false),
        );

        let response = tokio::time::timeout(
            Duration::from_secs(5),
            transport.round_trip(&RequestContext::background(), request(Method::POST)),
        )
        .await
        .expect("Retry-After: 0 should replace the 20s backoff")
        .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(inner.calls(), 2);
    }

    #[test]
    fn test_retry_after_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_attempt_timeout_is_capped() {
        assert_eq!(attempt_timeout(None), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            attempt_timeout(Some(Duration::from_secs(300))),
            DEFAULT_REQUEST_TIMEOUT
        );
        assert_eq!(
            attempt_timeout(Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
    }
}
