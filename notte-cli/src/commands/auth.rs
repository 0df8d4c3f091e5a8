//! Auth command - browser login, logout and status.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Subcommand};
use notte_auth::{LOGIN_TIMEOUT, LoginOptions, LoginServer, validate_console_url};
use notte_fetch::{API_KEY_ENTRY, RequestContext, default_keychain};
use notte_store::{CredentialResolver, ProcessEnv, console_url};
use serde_json::json;
use tracing::debug;

use super::input::confirm;
use super::resolve_api_url;
use crate::Cli;
use crate::output::Output;

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Authenticate with notte.cc in the browser.
    ///
    /// Either sign in with the Notte Console, which hands the API key back
    /// automatically, or paste a key from console.notte.cc/apikeys. The key
    /// is stored in the system keychain.
    Login,

    /// Remove the stored API key from the keychain.
    Logout,

    /// Show current authentication status.
    Status,
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, cli: &Cli) -> Result<()> {
    match args.action {
        AuthAction::Login => login(cli).await,
        AuthAction::Logout => logout(cli).await,
        AuthAction::Status => status(cli).await,
    }
}

async fn login(cli: &Cli) -> Result<()> {
    let output = Output::from_cli(cli);
    output.info("Opening browser for authentication...");

    let env = ProcessEnv;
    let console = validate_console_url(&console_url(&env))?;
    let options = LoginOptions {
        api_url: resolve_api_url(&env).await,
        console_url: console.as_str().trim_end_matches('/').to_string(),
        open_browser: true,
    };

    let server = LoginServer::bind(default_keychain(), options)
        .await
        .context("failed to initialize auth server")?;
    debug!(base_url = %server.base_url(), "Waiting for browser login");

    let ctx = RequestContext::with_timeout(LOGIN_TIMEOUT);
    server
        .run(&ctx)
        .await
        .map_err(|e| anyhow!("authentication failed: {e}"))?;

    output.print_result(
        "API key stored successfully in keychain.",
        json!({"authenticated": true, "source": "keychain"}),
    )
}

async fn logout(cli: &Cli) -> Result<()> {
    if !confirm(cli, "remove the API key from the keychain")? {
        return Ok(());
    }

    default_keychain()
        .delete(API_KEY_ENTRY)
        .await
        .map_err(|e| anyhow!("failed to remove API key: {e}"))?;

    Output::from_cli(cli).print_result(
        "API key removed from keychain.",
        json!({"authenticated": false}),
    )
}

async fn status(cli: &Cli) -> Result<()> {
    let credential = CredentialResolver::new(default_keychain())
        .resolve()
        .await
        .map_err(|e| anyhow!("not authenticated: {e}"))?;

    Output::from_cli(cli).print(&json!({
        "authenticated": "yes",
        "source": credential.source.as_str(),
        "api_key": credential.masked(),
    }))
}
