//! Functions and workflows commands.
//!
//! Both resources share one command tree; only the API path and the labels
//! in messages differ.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use notte_core::{FunctionResponse, FunctionRunResponse, ListResponse};
use serde_json::json;
use tracing::debug;

use super::Api;
use super::files::file_form_with;
use super::input::{confirm, parse_json_input};
use crate::Cli;
use crate::output::Output;

/// Which deployable resource a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Functions,
    Workflows,
}

impl Resource {
    /// First API path segment.
    pub fn path(self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Workflows => "workflows",
        }
    }

    /// Capitalized singular name used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Functions => "Function",
            Self::Workflows => "Workflow",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Functions => "function",
            Self::Workflows => "workflow",
        }
    }
}

/// Arguments for the functions and workflows commands.
#[derive(Args)]
pub struct FunctionsArgs {
    #[command(subcommand)]
    pub action: FunctionsAction,
}

/// Functions subcommands.
#[derive(Subcommand)]
pub enum FunctionsAction {
    /// List deployed definitions.
    List,

    /// Create a definition from a source file.
    Create {
        /// Path to the source file.
        #[arg(long)]
        file: PathBuf,

        /// Display name.
        #[arg(long)]
        name: Option<String>,

        /// Description.
        #[arg(long)]
        description: Option<String>,

        /// Make the definition public.
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        shared: Option<bool>,
    },

    /// Show a definition.
    Show(IdArg),

    /// Upload a new version from a source file.
    Update {
        #[command(flatten)]
        target: IdArg,

        /// Path to the updated source file.
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete a definition.
    Delete(IdArg),

    /// Fork a shared definition into your account.
    Fork(IdArg),

    /// Start a run.
    Run(IdArg),

    /// List runs.
    Runs(IdArg),

    /// Stop a run.
    RunStop(RunArgs),

    /// Show run metadata.
    #[command(alias = "run-status")]
    RunMetadata(RunArgs),

    /// Replace run metadata.
    RunMetadataUpdate {
        #[command(flatten)]
        run: RunArgs,

        /// Metadata JSON, @file, or '-' for stdin.
        #[arg(long)]
        data: Option<String>,
    },

    /// Run on a cron schedule.
    Schedule {
        #[command(flatten)]
        target: IdArg,

        /// Cron expression.
        #[arg(long)]
        cron: String,
    },

    /// Remove the schedule.
    Unschedule(IdArg),
}

/// The `--id` of an existing definition.
#[derive(Args)]
pub struct IdArg {
    /// Function or workflow ID.
    #[arg(long)]
    pub id: String,
}

/// A definition ID plus one of its runs.
#[derive(Args)]
pub struct RunArgs {
    /// Function or workflow ID.
    #[arg(long)]
    pub id: String,

    /// Run ID.
    #[arg(long)]
    pub run_id: String,
}

/// Runs the functions (or workflows) command.
pub async fn run(resource: Resource, args: &FunctionsArgs, cli: &Cli) -> Result<()> {
    let root = resource.path();
    let label = resource.label();
    let output = Output::from_cli(cli);

    if let FunctionsAction::Delete(IdArg { id }) = &args.action {
        if !confirm(cli, &format!("delete {} {id}", resource.noun()))? {
            return Ok(());
        }
        let api = Api::connect(cli).await?;
        api.send(api.client.delete(&[root, id])).await?;
        return output.print_result(
            &format!("{label} {id} deleted."),
            json!({"id": id, "status": "deleted"}),
        );
    }

    let api = Api::connect(cli).await?;
    let client = &api.client;

    match &args.action {
        FunctionsAction::List => {
            let page: ListResponse<FunctionResponse> = api.send_json(client.get(&[root])).await?;
            output.print_list(&page.items, &format!("No {root} found."))
        }
        FunctionsAction::Create {
            file,
            name,
            description,
            shared,
        } => {
            let mut fields = Vec::new();
            if let Some(name) = name.as_ref().filter(|n| !n.is_empty()) {
                fields.push(("name", name.clone()));
            }
            if let Some(description) = description.as_ref().filter(|d| !d.is_empty()) {
                fields.push(("description", description.clone()));
            }
            if let Some(shared) = shared {
                fields.push(("shared", shared.to_string()));
            }
            let (filename, data) = read_source(file).await?;
            debug!(resource = root, file = %filename, "Creating definition");

            let created: FunctionResponse = api
                .send_json(client.post(&[root]).multipart(file_form_with(filename, data, fields)))
                .await?;
            output.print(&created)
        }
        FunctionsAction::Show(IdArg { id }) => {
            let definition: FunctionResponse = api.send_json(client.get(&[root, id])).await?;
            output.print(&definition)
        }
        FunctionsAction::Update {
            target: IdArg { id },
            file,
        } => {
            let (filename, data) = read_source(file).await?;
            let updated: FunctionResponse = api
                .send_json(
                    client
                        .post(&[root, id])
                        .multipart(file_form_with(filename, data, Vec::new())),
                )
                .await?;
            output.print(&updated)
        }
        FunctionsAction::Fork(IdArg { id }) => {
            let fork: FunctionResponse = api.send_json(client.post(&[root, id, "fork"])).await?;
            output.print(&fork)
        }
        FunctionsAction::Run(IdArg { id }) => {
            let started = api
                .send_value(client.post(&[root, id, "runs", "start"]).json(&json!({})))
                .await?;
            output.print(&started)
        }
        FunctionsAction::Runs(IdArg { id }) => {
            let page: ListResponse<FunctionRunResponse> =
                api.send_json(client.get(&[root, id, "runs"])).await?;
            output.print_list(&page.items, &format!("No {} runs found.", resource.noun()))
        }
        FunctionsAction::RunStop(RunArgs { id, run_id }) => {
            let stopped = api
                .send_value(client.delete(&[root, id, "runs", run_id]))
                .await?;
            output.print(&stopped)
        }
        FunctionsAction::RunMetadata(RunArgs { id, run_id }) => {
            let run: FunctionRunResponse =
                api.send_json(client.get(&[root, id, "runs", run_id])).await?;
            output.print(&run)
        }
        FunctionsAction::RunMetadataUpdate {
            run: RunArgs { id, run_id },
            data,
        } => {
            let metadata = parse_json_input(data.as_deref(), "data")?;
            let run = api
                .send_value(client.patch(&[root, id, "runs", run_id]).json(&metadata))
                .await?;
            output.print(&run)
        }
        FunctionsAction::Schedule {
            target: IdArg { id },
            cron,
        } => {
            api.send(client.post(&[root, id, "schedule"]).json(&json!({"cron": cron})))
                .await?;
            output.print_result(
                &format!("{label} {id} scheduled with cron expression: {cron}"),
                json!({"id": id, "cron": cron}),
            )
        }
        FunctionsAction::Unschedule(IdArg { id }) => {
            api.send(client.delete(&[root, id, "schedule"])).await?;
            output.print_result(
                &format!("{label} {id} schedule removed."),
                json!({"id": id, "status": "unscheduled"}),
            )
        }
        FunctionsAction::Delete(_) => Ok(()),
    }
}

async fn read_source(path: &Path) -> Result<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("invalid file path: {}", path.display()))?;
    let data = tokio::fs::read(path).await.context("failed to open file")?;
    Ok((filename, data))
}
