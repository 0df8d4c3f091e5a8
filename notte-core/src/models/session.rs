//! Browser session payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::FlexibleTime;

/// A browser session as reported by `/sessions` endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub session_id: String,
    /// Lifecycle status (`active`, `closed`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Time the session was closed, when it has been.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub closed_at: FlexibleTime,
    /// Last activity.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub last_accessed_at: FlexibleTime,
    /// Idle timeout in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_minutes: Option<u32>,
    /// Hard lifetime cap in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<u32>,
    /// Browser engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_type: Option<String>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /sessions/start`. Unset fields use server defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStartRequest {
    /// Run without a visible window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Browser engine (`chromium`, `chrome`, `firefox`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_type: Option<String>,
    /// Idle timeout in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_minutes: Option<u32>,
    /// Hard lifetime cap in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<u32>,
    /// Route traffic through the default proxies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxies: Option<bool>,
    /// Solve captchas automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solve_captchas: Option<bool>,
    /// Viewport width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,
    /// Viewport height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
    /// Custom user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// CDP endpoint of an externally hosted browser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdp_url: Option<String>,
    /// Enable file storage for uploads and downloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_file_storage: Option<bool>,
}

/// Result of `POST /sessions/{id}/page/execute`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResponse {
    /// Whether the action succeeded.
    #[serde(default)]
    pub success: bool,
    /// Human-readable outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a scrape, either of a live page or a one-shot URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeResponse {
    /// Page content rendered as markdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Structured extraction result, present when instructions were given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredData>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of an instruction-driven extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredData {
    /// Whether extraction succeeded.
    #[serde(default)]
    pub success: bool,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extracted data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
