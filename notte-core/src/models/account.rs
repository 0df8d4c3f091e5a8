//! Health and usage payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status, typically `"ok"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `GET /usage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageResponse {
    /// Billing period the numbers cover, e.g. `"May 2025"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Credits consumed in the period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<f64>,
    /// Credits available to the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits_total: Option<f64>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
