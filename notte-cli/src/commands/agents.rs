//! Agents command - start and manage AI agents.

use anyhow::Result;
use clap::{Args, Subcommand};
use notte_core::{AgentResponse, AgentStartRequest, ListResponse};
use serde_json::json;

use super::Api;
use super::input::confirm;
use crate::Cli;
use crate::output::Output;

/// Arguments for the agents command.
#[derive(Args)]
pub struct AgentsArgs {
    #[command(subcommand)]
    pub action: AgentsAction,
}

/// Agents subcommands.
#[derive(Subcommand)]
pub enum AgentsAction {
    /// List running agents.
    List,

    /// Start a new agent.
    Start(AgentStartArgs),

    /// Get agent status.
    Status(AgentIdArg),

    /// Stop an agent.
    Stop(AgentIdArg),

    /// Export the agent's steps as workflow code.
    WorkflowCode(AgentIdArg),

    /// Get the agent replay.
    Replay(AgentIdArg),
}

/// The `--id` of an existing agent.
#[derive(Args)]
pub struct AgentIdArg {
    /// Agent ID.
    #[arg(long)]
    pub id: String,
}

/// Arguments for `agents start`.
#[derive(Args)]
pub struct AgentStartArgs {
    /// Task for the agent.
    #[arg(long)]
    pub task: String,

    /// Session ID to use.
    #[arg(long)]
    pub session: Option<String>,

    /// Vault ID for credentials.
    #[arg(long)]
    pub vault: Option<String>,

    /// Persona ID to use.
    #[arg(long)]
    pub persona: Option<String>,

    /// Maximum steps.
    #[arg(long, default_value_t = 30)]
    pub max_steps: u32,

    /// Reasoning model to use.
    #[arg(long)]
    pub reasoning_model: Option<String>,
}

impl AgentStartArgs {
    /// Request body; empty ids are left out.
    pub fn to_request(&self) -> AgentStartRequest {
        let text = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        AgentStartRequest {
            task: self.task.clone(),
            session_id: text(&self.session),
            vault_id: text(&self.vault),
            persona_id: text(&self.persona),
            max_steps: Some(self.max_steps),
            reasoning_model: text(&self.reasoning_model),
        }
    }
}

/// Runs the agents command.
pub async fn run(args: &AgentsArgs, cli: &Cli) -> Result<()> {
    if let AgentsAction::Stop(AgentIdArg { id }) = &args.action {
        return stop(id, cli).await;
    }

    let api = Api::connect(cli).await?;
    let output = Output::from_cli(cli);
    let client = &api.client;

    match &args.action {
        AgentsAction::List => {
            let page: ListResponse<AgentResponse> = api.send_json(client.get(&["agents"])).await?;
            output.print_list(&page.items, "No running agents.")
        }
        AgentsAction::Start(start) => {
            let agent: AgentResponse = api
                .send_json(client.post(&["agents", "start"]).json(&start.to_request()))
                .await?;
            output.print(&agent)
        }
        AgentsAction::Status(AgentIdArg { id }) => {
            let agent: AgentResponse = api.send_json(client.get(&["agents", id])).await?;
            output.print(&agent)
        }
        AgentsAction::WorkflowCode(AgentIdArg { id }) => {
            let code = api
                .send_value(
                    client
                        .get(&["agents", id, "workflow", "code"])
                        .query("as_workflow", true),
                )
                .await?;
            output.print(&code)
        }
        AgentsAction::Replay(AgentIdArg { id }) => {
            let response = api.send(client.get(&["agents", id, "replay"])).await?;
            output.print(&json!({"agent_id": id, "replay_data": response.text()}))
        }
        AgentsAction::Stop(_) => Ok(()),
    }
}

async fn stop(id: &str, cli: &Cli) -> Result<()> {
    if !confirm(cli, &format!("stop agent {id}"))? {
        return Ok(());
    }

    let api = Api::connect(cli).await?;
    // The endpoint requires the parameter but accepts it empty.
    let request = api
        .client
        .delete(&["agents", id, "stop"])
        .query("session_id", "");
    api.send(request).await?;

    Output::from_cli(cli).print_result(
        &format!("Agent {id} stopped."),
        json!({"id": id, "status": "stopped"}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct AgentsCli {
        #[command(subcommand)]
        action: AgentsAction,
    }

    fn start_body(args: &[&str]) -> serde_json::Value {
        let mut argv = vec!["agents", "start"];
        argv.extend_from_slice(args);
        match AgentsCli::try_parse_from(argv).unwrap().action {
            AgentsAction::Start(start) => serde_json::to_value(start.to_request()).unwrap(),
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_start_defaults() {
        assert_eq!(
            start_body(&["--task", "find the cheapest flight"]),
            json!({"task": "find the cheapest flight", "max_steps": 30})
        );
    }

    #[test]
    fn test_start_with_resources() {
        assert_eq!(
            start_body(&[
                "--task", "log in", "--session", "s1", "--vault", "v1", "--persona", "",
                "--max-steps", "5", "--reasoning-model", "gpt-4o",
            ]),
            json!({
                "task": "log in",
                "session_id": "s1",
                "vault_id": "v1",
                "max_steps": 5,
                "reasoning_model": "gpt-4o"
            })
        );
    }

    #[test]
    fn test_task_is_required() {
        assert!(AgentsCli::try_parse_from(["agents", "start"]).is_err());
    }

    #[test]
    fn test_status_requires_id() {
        assert!(AgentsCli::try_parse_from(["agents", "status"]).is_err());
    }
}
