//! Page command - single actions against a session's current page.
//!
//! Every action becomes one `{"type": ...}` object posted to
//! `/sessions/{id}/page/execute`. Elements are addressed either by the id
//! shown in `page observe` (`@B3`) or by a CSS selector.

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Subcommand};
use notte_core::{ExecutionResponse, ScrapeResponse};
use notte_store::ProcessEnv;
use serde_json::{Map, Value, json};

use super::input::resolve_session_id;
use super::sessions::scrape_body;
use super::{Api, non_empty, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for the page command.
#[derive(Args)]
pub struct PageArgs {
    #[command(subcommand)]
    pub action: PageAction,

    /// Session ID (defaults to NOTTE_SESSION_ID).
    #[arg(long, global = true)]
    pub id: Option<String>,
}

/// Page subcommands.
#[derive(Subcommand)]
pub enum PageAction {
    /// Click an element.
    Click {
        /// Element as @id or CSS selector.
        target: String,

        /// Timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Press Enter after clicking.
        #[arg(long)]
        enter: bool,
    },

    /// Fill an input field with a value.
    Fill {
        /// Element as @id or CSS selector.
        target: String,

        /// Text to type.
        value: String,

        /// Clear the field before filling.
        #[arg(long)]
        clear: bool,

        /// Press Enter after filling.
        #[arg(long)]
        enter: bool,
    },

    /// Check or uncheck a checkbox.
    Check {
        /// Element as @id or CSS selector.
        target: String,

        /// Check (true) or uncheck (false).
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        value: bool,
    },

    /// Select a dropdown option.
    Select {
        /// Element as @id or CSS selector.
        target: String,

        /// Option to select.
        value: String,
    },

    /// Download the file behind an element.
    Download {
        /// Element as @id or CSS selector.
        target: String,
    },

    /// Upload a file to an input element.
    Upload {
        /// Element as @id or CSS selector.
        target: String,

        /// Path to the file to upload.
        #[arg(long)]
        file: String,
    },

    /// Navigate to a URL.
    Goto {
        /// Destination URL.
        url: String,
    },

    /// Open a URL in a new tab.
    NewTab {
        /// Destination URL.
        url: String,
    },

    /// Go back in history.
    Back,

    /// Go forward in history.
    Forward,

    /// Reload the page.
    Reload,

    /// Scroll down the page.
    ScrollDown {
        /// Pixels to scroll.
        amount: Option<i64>,
    },

    /// Scroll up the page.
    ScrollUp {
        /// Pixels to scroll.
        amount: Option<i64>,
    },

    /// Press a keyboard key.
    Press {
        /// Key name, e.g. Enter or Tab.
        key: String,
    },

    /// Switch to a tab by index (0-based).
    SwitchTab {
        /// Tab index.
        index: i64,
    },

    /// Close the current tab.
    CloseTab,

    /// Wait for a number of milliseconds.
    Wait {
        /// Milliseconds to wait.
        milliseconds: u64,
    },

    /// Solve a captcha on the page.
    CaptchaSolve {
        /// Captcha type, e.g. recaptcha.
        captcha_type: String,
    },

    /// Mark the task as complete with an answer.
    Complete {
        /// Final answer.
        answer: String,

        /// Whether the task succeeded.
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        success: bool,
    },

    /// Fill a form from a JSON object of field values.
    FormFill {
        /// JSON object with form field values.
        #[arg(long)]
        data: String,
    },

    /// Observe the current page state.
    Observe {
        /// Navigate to URL before observing.
        #[arg(long)]
        url: Option<String>,
    },

    /// Scrape content from the page.
    Scrape {
        /// Extraction instructions.
        instructions: Option<String>,

        /// Only scrape main content.
        #[arg(long)]
        main_only: bool,
    },
}

/// Runs the page command.
pub async fn run(args: &PageArgs, cli: &Cli) -> Result<()> {
    let id = resolve_session_id(args.id.as_deref(), &ProcessEnv)?;

    match &args.action {
        PageAction::Observe { url } => observe(&id, url.as_ref(), cli).await,
        PageAction::Scrape {
            instructions,
            main_only,
        } => scrape(&id, instructions.as_ref(), *main_only, cli).await,
        action => {
            let action = build_action(action)?;
            execute(&id, &action, cli).await
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Parses an element reference: `@X` is an element id, anything else a
/// CSS selector. Returns the JSON key and value to put in the action.
pub fn parse_target(target: &str) -> Result<(&'static str, String)> {
    if target.is_empty() {
        bail!("selector cannot be empty");
    }
    match target.strip_prefix('@') {
        Some("") => bail!("element ID cannot be empty (use @id format)"),
        Some(id) => Ok(("id", id.to_string())),
        None => Ok(("selector", target.to_string())),
    }
}

/// Builds the action object for an action subcommand.
pub fn build_action(action: &PageAction) -> Result<Value> {
    let mut fields = Map::new();
    let mut set = |key: &str, value: Value| {
        fields.insert(key.to_string(), value);
    };

    let kind = match action {
        PageAction::Click {
            target,
            timeout_ms,
            enter,
        } => {
            let (key, value) = parse_target(target)?;
            set(key, json!(value));
            if let Some(timeout) = timeout_ms.filter(|t| *t > 0) {
                set("timeout", json!(timeout));
            }
            if *enter {
                set("press_enter", json!(true));
            }
            "click"
        }
        PageAction::Fill {
            target,
            value,
            clear,
            enter,
        } => {
            let (key, target) = parse_target(target)?;
            set(key, json!(target));
            set("value", json!(value));
            if *clear {
                set("clear", json!(true));
            }
            if *enter {
                set("press_enter", json!(true));
            }
            "fill"
        }
        PageAction::Check { target, value } => {
            let (key, target) = parse_target(target)?;
            set(key, json!(target));
            set("value", json!(value));
            "check"
        }
        PageAction::Select { target, value } => {
            let (key, target) = parse_target(target)?;
            set(key, json!(target));
            set("value", json!(value));
            "select_dropdown_option"
        }
        PageAction::Download { target } => {
            let (key, target) = parse_target(target)?;
            set(key, json!(target));
            "download_file"
        }
        PageAction::Upload { target, file } => {
            let (key, target) = parse_target(target)?;
            set(key, json!(target));
            set("file_path", json!(file));
            "upload_file"
        }
        PageAction::Goto { url } => {
            set("url", json!(url));
            "goto"
        }
        PageAction::NewTab { url } => {
            set("url", json!(url));
            "goto_new_tab"
        }
        PageAction::Back => "go_back",
        PageAction::Forward => "go_forward",
        PageAction::Reload => "reload",
        PageAction::ScrollDown { amount } => {
            if let Some(amount) = amount {
                set("amount", json!(amount));
            }
            "scroll_down"
        }
        PageAction::ScrollUp { amount } => {
            if let Some(amount) = amount {
                set("amount", json!(amount));
            }
            "scroll_up"
        }
        PageAction::Press { key } => {
            set("key", json!(key));
            "press_key"
        }
        PageAction::SwitchTab { index } => {
            set("tab_index", json!(index));
            "switch_tab"
        }
        PageAction::CloseTab => "close_tab",
        PageAction::Wait { milliseconds } => {
            set("time_ms", json!(milliseconds));
            "wait"
        }
        PageAction::CaptchaSolve { captcha_type } => {
            set("captcha_type", json!(captcha_type));
            "captcha_solve"
        }
        PageAction::Complete { answer, success } => {
            set("answer", json!(answer));
            set("success", json!(success));
            "completion"
        }
        PageAction::FormFill { data } => {
            let form: Map<String, Value> =
                serde_json::from_str(data).context("invalid JSON data")?;
            set("value", Value::Object(form));
            "form_fill"
        }
        PageAction::Observe { .. } | PageAction::Scrape { .. } => {
            bail!("not an executable page action")
        }
    };

    let mut action = Map::new();
    action.insert("type".to_string(), json!(kind));
    action.extend(fields);
    Ok(Value::Object(action))
}

async fn execute(id: &str, action: &Value, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let response: ExecutionResponse = api
        .send_json(
            api.client
                .post(&["sessions", id, "page", "execute"])
                .json(action),
        )
        .await?;
    print_execution(&Output::from_cli(cli), &response)
}

/// JSON mode prints the whole response; text mode prints the message and
/// any returned data, or fails with the reported exception.
fn print_execution(output: &Output, response: &ExecutionResponse) -> Result<()> {
    if output.is_json() {
        return output.print(response);
    }
    if !response.success {
        let exception = response
            .extra
            .get("exception")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty());
        return Err(anyhow!("{}", exception.unwrap_or("action failed")));
    }

    println!("{}", response.message.as_deref().unwrap_or_default());
    match response.extra.get("data") {
        Some(data) if !data.is_null() => output.print(data),
        _ => Ok(()),
    }
}

// ============================================================================
// Observe / Scrape
// ============================================================================

async fn observe(id: &str, url: Option<&String>, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let body = object_from([("url", non_empty(url))]);
    let observation = api
        .send_value(
            api.client
                .post(&["sessions", id, "page", "observe"])
                .json(&body),
        )
        .await?;

    let output = Output::from_cli(cli);
    if output.is_json() {
        return output.print(&observation);
    }
    let description = observation
        .pointer("/space/description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    println!("{description}");
    Ok(())
}

async fn scrape(id: &str, instructions: Option<&String>, main_only: bool, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let body = scrape_body(instructions, main_only);
    let response: ScrapeResponse = api
        .send_json(
            api.client
                .post(&["sessions", id, "page", "scrape"])
                .json(&body),
        )
        .await?;
    Output::from_cli(cli).print_scrape(&response, instructions.is_some())
}
