//! Profiles command - persistent browser profiles.

use anyhow::Result;
use clap::{Args, Subcommand};
use notte_core::{ListResponse, ProfileResponse};
use serde_json::json;

use super::input::confirm;
use super::{Api, non_empty, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for the profiles command.
#[derive(Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub action: ProfilesAction,
}

/// Profiles subcommands.
#[derive(Subcommand)]
pub enum ProfilesAction {
    /// List browser profiles.
    List,

    /// Create a browser profile.
    Create {
        /// Profile name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show profile details.
    Show {
        /// Profile ID.
        #[arg(long)]
        id: String,
    },

    /// Delete a profile.
    Delete {
        /// Profile ID.
        #[arg(long)]
        id: String,
    },
}

/// Runs the profiles command.
pub async fn run(args: &ProfilesArgs, cli: &Cli) -> Result<()> {
    let output = Output::from_cli(cli);

    match &args.action {
        ProfilesAction::List => {
            let api = Api::connect(cli).await?;
            let page: ListResponse<ProfileResponse> =
                api.send_json(api.client.get(&["profiles"])).await?;
            output.print_list(&page.items, "No profiles found.")
        }
        ProfilesAction::Create { name } => {
            let api = Api::connect(cli).await?;
            let body = object_from([("name", non_empty(name.as_ref()))]);
            let profile: ProfileResponse = api
                .send_json(api.client.post(&["profiles"]).json(&body))
                .await?;
            output.print(&profile)
        }
        ProfilesAction::Show { id } => {
            let api = Api::connect(cli).await?;
            let profile: ProfileResponse =
                api.send_json(api.client.get(&["profiles", id])).await?;
            output.print(&profile)
        }
        ProfilesAction::Delete { id } => {
            if !confirm(cli, &format!("delete profile {id}"))? {
                return Ok(());
            }
            let api = Api::connect(cli).await?;
            api.send(api.client.delete(&["profiles", id])).await?;
            output.print_result(
                &format!("Profile {id} deleted."),
                json!({"id": id, "status": "deleted"}),
            )
        }
    }
}
