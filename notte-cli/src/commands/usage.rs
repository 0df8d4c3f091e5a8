//! Usage command - credits and request logs.

use anyhow::Result;
use clap::{Args, Subcommand};
use notte_core::{ListResponse, UsageResponse};
use serde_json::Value;

use super::Api;
use crate::Cli;
use crate::output::Output;

/// Arguments for the usage command.
#[derive(Args)]
pub struct UsageArgs {
    #[command(subcommand)]
    pub action: Option<UsageAction>,

    /// Monthly period to get usage for (e.g. "May 2025").
    #[arg(long)]
    pub period: Option<String>,
}

/// Usage subcommands.
#[derive(Subcommand)]
pub enum UsageAction {
    /// Show paginated usage logs.
    Logs(LogsArgs),
}

/// Arguments for `usage logs`.
#[derive(Args)]
pub struct LogsArgs {
    /// Filter logs by endpoint.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Page number.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Number of items per page.
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,

    /// Only return active sessions.
    #[arg(long)]
    pub only_active: Option<bool>,
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let output = Output::from_cli(cli);

    match &args.action {
        None => {
            let request = api
                .client
                .get(&["usage"])
                .query_opt("period", args.period.as_deref().filter(|p| !p.is_empty()));
            let usage: UsageResponse = api.send_json(request).await?;
            output.print(&usage)
        }
        Some(UsageAction::Logs(logs)) => {
            let request = api
                .client
                .get(&["usage", "logs"])
                .query_opt("endpoint", logs.endpoint.as_deref().filter(|e| !e.is_empty()))
                .query_opt("page", (logs.page > 0).then_some(logs.page))
                .query_opt("page_size", (logs.page_size > 0).then_some(logs.page_size))
                .query_opt("only_active", logs.only_active);
            let page: ListResponse<Value> = api.send_json(request).await?;
            output.print_list(&page.items, "No usage logs found.")
        }
    }
}
