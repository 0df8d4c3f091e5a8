//! Health command - check that the API is reachable.

use anyhow::Result;
use notte_core::HealthResponse;

use super::{Api, request_failed};
use crate::Cli;
use crate::output::Output;

/// Runs the health command.
pub async fn run(cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let response = api
        .client
        .health(&api.ctx)
        .await
        .map_err(request_failed)?
        .error_for_status()?;

    let health: HealthResponse = response.json()?;
    Output::from_cli(cli).print(&health)
}
