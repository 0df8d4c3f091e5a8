//! CLI command implementations.
//!
//! Every API-backed command goes through [`Api`]: it resolves the key,
//! builds the client and carries the per-invocation deadline.

pub mod agents;
pub mod auth;
pub mod config;
pub mod files;
pub mod functions;
pub mod health;
pub mod input;
pub mod page;
pub mod personas;
pub mod profiles;
pub mod scrape;
pub mod sessions;
pub mod usage;
pub mod vaults;

use std::time::Duration;

use anyhow::{Result, anyhow};
use notte_fetch::{
    ApiResponse, FetchError, NotteClient, RequestBuilder, RequestContext, default_keychain,
};
use notte_store::{Config, CredentialResolver, ENV_API_URL, EnvSource, ProcessEnv};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::Cli;

// ============================================================================
// API Access
// ============================================================================

/// An authenticated client plus the context every call runs under.
pub struct Api {
    /// Client bound to the resolved key and base URL.
    pub client: NotteClient,
    /// Deadline derived from `--timeout`.
    pub ctx: RequestContext,
}

impl Api {
    /// Resolves credentials and the base URL, then builds the client.
    pub async fn connect(cli: &Cli) -> Result<Self> {
        let credential = CredentialResolver::new(default_keychain()).resolve().await?;
        let base_url = resolve_api_url(&ProcessEnv).await;

        debug!(
            source = credential.source.as_str(),
            api_key = %credential.masked(),
            base_url = %base_url,
            "Connecting to API"
        );

        let client = NotteClient::builder(credential.api_key)
            .base_url(base_url)
            .build()?;
        Ok(Self::new(client, cli.timeout))
    }

    /// Wraps an existing client with a `timeout_secs` deadline.
    pub fn new(client: NotteClient, timeout_secs: u64) -> Self {
        Self {
            client,
            ctx: RequestContext::with_timeout(Duration::from_secs(timeout_secs)),
        }
    }

    /// Sends a request and rejects non-2xx statuses.
    pub async fn send(&self, request: RequestBuilder<'_>) -> Result<ApiResponse> {
        let response = request.send(&self.ctx).await.map_err(request_failed)?;
        Ok(response.error_for_status()?)
    }

    /// Sends a request and decodes the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder<'_>) -> Result<T> {
        Ok(self.send(request).await?.json()?)
    }

    /// Sends a request and decodes the body as untyped JSON. An empty body
    /// yields `null`.
    pub async fn send_value(&self, request: RequestBuilder<'_>) -> Result<Value> {
        let response = self.send(request).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(response.json()?)
    }
}

/// Base URL: `NOTTE_API_URL` wins without touching the config file.
pub async fn resolve_api_url(env: &dyn EnvSource) -> String {
    if let Some(url) = env.var(ENV_API_URL) {
        return url;
    }
    let config = match Config::load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Could not read config, using defaults");
            Config::defaults()
        }
    };
    config.effective_api_url(env)
}

/// API errors pass through untouched so their status reaches the output;
/// everything else is reported as a failed request.
pub fn request_failed(err: FetchError) -> anyhow::Error {
    match err {
        FetchError::Api(api) => api.into(),
        other => anyhow!("API request failed: {other}"),
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Builds a JSON object from the pairs whose value is present.
pub fn object_from<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Option<Value>)>,
{
    Value::Object(
        pairs
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect(),
    )
}

/// A non-empty string as a JSON value.
pub fn non_empty(value: Option<&String>) -> Option<Value> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| Value::String(v.clone()))
}
