//! Sessions command - browser session lifecycle and session-level tools.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use notte_core::{ExecutionResponse, ListResponse, ScrapeResponse, SessionResponse, SessionStartRequest};
use notte_store::ProcessEnv;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::input::{confirm, parse_json_input, resolve_session_id};
use super::{Api, non_empty, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for the sessions command.
#[derive(Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub action: SessionsAction,

    /// Session ID (defaults to NOTTE_SESSION_ID).
    #[arg(long, global = true)]
    pub id: Option<String>,
}

/// Sessions subcommands.
#[derive(Subcommand)]
pub enum SessionsAction {
    /// List active sessions.
    List,

    /// Start a new browser session.
    Start(StartArgs),

    /// Show session status.
    Status,

    /// Stop a session.
    Stop,

    /// Observe the current page and list available actions.
    Observe {
        /// Navigate to URL before observing.
        #[arg(long)]
        url: Option<String>,
    },

    /// Execute a raw action.
    Execute {
        /// Action JSON, @file, or '-' for stdin.
        #[arg(long)]
        action: Option<String>,
    },

    /// Scrape the current page.
    Scrape {
        /// Extraction instructions.
        #[arg(long)]
        instructions: Option<String>,

        /// Only scrape main content.
        #[arg(long)]
        only_main_content: bool,
    },

    /// Get session cookies.
    Cookies,

    /// Set session cookies from a JSON file.
    CookiesSet {
        /// JSON file containing a cookies array.
        #[arg(long)]
        file: String,
    },

    /// Get debug info (CDP and viewer URLs).
    Debug,

    /// Get network logs.
    Network,

    /// Get the session replay.
    Replay,

    /// Get session step offset.
    Offset,

    /// Export the session's steps as workflow code.
    WorkflowCode,

    /// Print the session's steps as a Python script.
    Code,
}

/// Arguments for `sessions start`.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Run session in headless mode.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub headless: Option<bool>,

    /// Browser type.
    #[arg(long, default_value = "chromium", value_parser = ["chromium", "chrome", "firefox"])]
    pub browser: String,

    /// Idle timeout in minutes.
    #[arg(long)]
    pub idle_timeout: Option<u32>,

    /// Maximum session lifetime in minutes.
    #[arg(long)]
    pub max_duration: Option<u32>,

    /// Use default proxies.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub proxies: Option<bool>,

    /// Automatically solve captchas.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub solve_captchas: Option<bool>,

    /// Viewport width in pixels.
    #[arg(long)]
    pub viewport_width: Option<u32>,

    /// Viewport height in pixels.
    #[arg(long)]
    pub viewport_height: Option<u32>,

    /// Custom user agent string.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// CDP URL of a remote session provider.
    #[arg(long)]
    pub cdp_url: Option<String>,

    /// Enable file storage for the session.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub file_storage: Option<bool>,
}

impl StartArgs {
    /// Request body carrying only the options that were set.
    pub fn to_request(&self) -> SessionStartRequest {
        let positive = |v: Option<u32>| v.filter(|n| *n > 0);
        let text = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        SessionStartRequest {
            headless: self.headless,
            browser_type: Some(self.browser.clone()).filter(|b| !b.is_empty()),
            idle_timeout_minutes: positive(self.idle_timeout),
            max_duration_minutes: positive(self.max_duration),
            proxies: self.proxies,
            solve_captchas: self.solve_captchas,
            viewport_width: positive(self.viewport_width),
            viewport_height: positive(self.viewport_height),
            user_agent: text(&self.user_agent),
            cdp_url: text(&self.cdp_url),
            use_file_storage: self.file_storage,
        }
    }
}

/// Runs the sessions command.
pub async fn run(args: &SessionsArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        SessionsAction::List => list(cli).await,
        SessionsAction::Start(start_args) => start(start_args, cli).await,
        SessionsAction::Stop => stop(&session_id(args)?, cli).await,
        action => run_for_session(action, &session_id(args)?, cli).await,
    }
}

fn session_id(args: &SessionsArgs) -> Result<String> {
    resolve_session_id(args.id.as_deref(), &ProcessEnv)
}

async fn list(cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let page: ListResponse<SessionResponse> = api.send_json(api.client.get(&["sessions"])).await?;

    let output = Output::from_cli(cli);
    if output.is_json() || page.items.is_empty() {
        return output.print_list(&page.items, "No active sessions.");
    }
    output.print_table(&SESSION_COLUMNS, &session_rows(&page.items))
}

const SESSION_COLUMNS: [&str; 4] = ["ID", "STATUS", "BROWSER", "CREATED"];

fn session_rows(sessions: &[SessionResponse]) -> Vec<Map<String, Value>> {
    sessions
        .iter()
        .map(|session| {
            let mut row = Map::new();
            row.insert("ID".to_string(), json!(session.session_id));
            if let Some(status) = &session.status {
                row.insert("STATUS".to_string(), json!(status));
            }
            if let Some(browser) = &session.browser_type {
                row.insert("BROWSER".to_string(), json!(browser));
            }
            if !session.created_at.is_zero() {
                row.insert("CREATED".to_string(), json!(session.created_at));
            }
            row
        })
        .collect()
}

async fn start(args: &StartArgs, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let body = args.to_request();
    debug!(request = ?body, "Starting session");

    let session: SessionResponse = api
        .send_json(api.client.post(&["sessions", "start"]).json(&body))
        .await?;
    Output::from_cli(cli).print(&session)
}

async fn run_for_session(action: &SessionsAction, id: &str, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let output = Output::from_cli(cli);
    let client = &api.client;

    match action {
        SessionsAction::Status => {
            let session: SessionResponse = api.send_json(client.get(&["sessions", id])).await?;
            output.print(&session)
        }
        SessionsAction::Observe { url } => {
            let body = object_from([("url", non_empty(url.as_ref()))]);
            let observation = api
                .send_value(client.post(&["sessions", id, "page", "observe"]).json(&body))
                .await?;
            output.print(&observation)
        }
        SessionsAction::Execute { action } => {
            let action = parse_json_input(action.as_deref(), "action")?;
            let result: ExecutionResponse = api
                .send_json(client.post(&["sessions", id, "page", "execute"]).json(&action))
                .await?;
            output.print(&result)
        }
        SessionsAction::Scrape {
            instructions,
            only_main_content,
        } => {
            let body = scrape_body(instructions.as_ref(), *only_main_content);
            let response: ScrapeResponse = api
                .send_json(client.post(&["sessions", id, "page", "scrape"]).json(&body))
                .await?;
            output.print_scrape(&response, body.get("instructions").is_some())
        }
        SessionsAction::Cookies => print_get(&api, &output, &["sessions", id, "cookies"]).await,
        SessionsAction::CookiesSet { file } => {
            let data = std::fs::read(file).context("failed to read cookies file")?;
            let cookies: Value =
                serde_json::from_slice(&data).context("failed to parse cookies JSON")?;
            let result = api
                .send_value(client.post(&["sessions", id, "cookies"]).json(&cookies))
                .await?;
            output.print(&result)
        }
        SessionsAction::Debug => print_get(&api, &output, &["sessions", id, "debug"]).await,
        SessionsAction::Network => {
            print_get(&api, &output, &["sessions", id, "network", "logs"]).await
        }
        SessionsAction::Replay => {
            let response = api.send(client.get(&["sessions", id, "replay"])).await?;
            output.print(&json!({"session_id": id, "replay_data": response.text()}))
        }
        SessionsAction::Offset => print_get(&api, &output, &["sessions", id, "offset"]).await,
        SessionsAction::WorkflowCode => {
            let code = api
                .send_value(
                    client
                        .get(&["sessions", id, "workflow", "code"])
                        .query("as_workflow", true),
                )
                .await?;
            output.print(&code)
        }
        SessionsAction::Code => {
            let code = api
                .send_value(client.get(&["sessions", id, "workflow", "code"]))
                .await?;
            if let Some(script) = code.get("python_script").and_then(Value::as_str) {
                println!("{script}");
            }
            Ok(())
        }
        SessionsAction::List | SessionsAction::Start(_) | SessionsAction::Stop => Ok(()),
    }
}

async fn stop(id: &str, cli: &Cli) -> Result<()> {
    if !confirm(cli, &format!("stop session {id}"))? {
        return Ok(());
    }

    let api = Api::connect(cli).await?;
    api.send(api.client.delete(&["sessions", id, "stop"])).await?;

    Output::from_cli(cli).print_result(
        &format!("Session {id} stopped."),
        json!({"id": id, "status": "stopped"}),
    )
}

/// Body for a scrape call; unset options are left out.
pub fn scrape_body(instructions: Option<&String>, only_main_content: bool) -> Value {
    object_from([
        ("instructions", non_empty(instructions)),
        ("only_main_content", only_main_content.then_some(Value::Bool(true))),
    ])
}

async fn print_get(api: &Api, output: &Output, path: &[&str]) -> Result<()> {
    let value = api.send_value(api.client.get(path)).await?;
    output.print(&value)
}
