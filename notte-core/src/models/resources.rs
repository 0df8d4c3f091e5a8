//! Vaults, personas, profiles and functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::FlexibleTime;

/// A credential vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultResponse {
    /// Vault identifier.
    pub vault_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A persona with its own email address and optional phone number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaResponse {
    /// Persona identifier.
    pub persona_id: String,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number, when one was provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Linked vault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A browser profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// Profile identifier.
    pub profile_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A function (or workflow) definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Function identifier. Workflows report the same field as `workflow_id`.
    #[serde(alias = "workflow_id")]
    pub function_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Latest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    /// Whether the function is public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single run of a function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionRunResponse {
    /// Run identifier. Workflows report it as `workflow_run_id`.
    #[serde(alias = "workflow_run_id")]
    pub function_run_id: String,
    /// Lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Session backing the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Start time.
    #[serde(default, skip_serializing_if = "FlexibleTime::is_zero")]
    pub created_at: FlexibleTime,
    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
