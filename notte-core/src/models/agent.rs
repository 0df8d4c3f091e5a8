//! Agent payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::FlexibleTime;

/// An agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Agent identifier.
    pub agent_id: String,
    /// Session the agent drives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Task the agent was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Final answer, once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Whether the task was completed successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /agents/start`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStartRequest {
    /// Natural-language task.
    pub task: String,
    /// Session to run in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Vault supplying credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    /// Persona to act as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
    /// Step budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    /// Model used for reasoning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_model: Option<String>,
}
