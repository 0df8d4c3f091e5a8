//! Response models for the Notte API.
//!
//! Every field the CLI does not strictly need is optional, and anything the
//! server sends that is not modelled lands in an `extra` map so JSON output
//! stays lossless.
//!
//! ## Submodules
//!
//! - [`account`] - health and usage
//! - [`session`] - browser sessions, page actions and scraping
//! - [`agent`] - agents
//! - [`resources`] - vaults, personas, profiles, functions

pub mod account;
pub mod agent;
pub mod resources;
pub mod session;

use serde::{Deserialize, Serialize};

pub use account::{HealthResponse, UsageResponse};
pub use agent::{AgentResponse, AgentStartRequest};
pub use resources::{
    FunctionResponse, FunctionRunResponse, PersonaResponse, ProfileResponse, VaultResponse,
};
pub use session::{ExecutionResponse, ScrapeResponse, SessionResponse, SessionStartRequest};

/// A page of results as returned by the list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// The items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// 1-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Requested page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Whether a further page exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: None,
            page_size: None,
            has_next: None,
        }
    }
}
