//! Config command - inspect and edit the local config file.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use notte_fetch::parse_base_url;
use notte_store::{Config, ProcessEnv, mask_api_key};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::Cli;
use crate::output::Output;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the config file path and effective settings.
    Show,

    /// Set the API base URL.
    SetUrl {
        /// Base URL, e.g. https://api.notte.cc.
        url: String,
    },

    /// Delete the config file.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::SetUrl { url } => set_url(url, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let path = Config::default_path()?;
    let config = Config::load_from(&path).await?;
    Output::from_cli(cli).print(&describe(&config, &path.display().to_string()))
}

fn describe(config: &Config, path: &str) -> Value {
    let mut fields = Map::new();
    fields.insert("config_file".to_string(), json!(path));
    fields.insert(
        "api_url".to_string(),
        json!(config.effective_api_url(&ProcessEnv)),
    );
    if let Some(key) = &config.api_key {
        fields.insert("api_key".to_string(), json!(mask_api_key(key)));
    }
    Value::Object(fields)
}

async fn set_url(url: &str, cli: &Cli) -> Result<()> {
    let url = parse_base_url(url)?.as_str().trim_end_matches('/').to_string();

    let path = Config::default_path()?;
    let mut config = Config::load_from(&path)
        .await
        .context("failed to load config")?;
    config.api_url = Some(url.clone());
    config
        .save_to(&path)
        .await
        .context("failed to save config")?;

    info!(api_url = %url, "API URL updated");
    Output::from_cli(cli).print_result(
        &format!("API URL set to {url}"),
        json!({"api_url": url}),
    )
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let path = Config::default_path()?;
    let removed = Config::reset_at(&path).await?;
    let message = if removed {
        info!(path = %path.display(), "Config reset");
        "Configuration reset to defaults."
    } else {
        "No configuration file to reset."
    };
    Output::from_cli(cli).print_result(message, json!({"reset": removed}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_masks_stored_key() {
        let config = Config {
            api_key: Some("sk-abcdefghijklmnop".to_string()),
            api_url: Some("https://example.test".to_string()),
        };
        let value = describe(&config, "/home/u/.notte/cli/config.json");
        assert_eq!(value["config_file"], "/home/u/.notte/cli/config.json");
        assert_eq!(value["api_key"], mask_api_key("sk-abcdefghijklmnop"));
        assert!(!value.to_string().contains("sk-abcdefghijklmnop"));
    }

    #[test]
    fn test_describe_without_key() {
        let value = describe(&Config::defaults(), "/tmp/config.json");
        assert!(value.get("api_key").is_none());
        assert!(value.get("api_url").is_some());
    }
}
