// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Notte CLI - browser sessions, agents and scraping from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Authenticate (opens a browser)
//! notte auth login
//!
//! # Start a browser session and drive it
//! notte sessions start --headless
//! notte page goto https://example.com --id <session-id>
//! notte page click @B3 --id <session-id>
//!
//! # One-shot scrape
//! notte scrape https://example.com --instructions "extract the title"
//!
//! # JSON output for scripting
//! notte sessions list -o json
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{
    agents, auth, config, files, functions, health, page, personas, profiles, scrape, sessions,
    usage, vaults,
};
use output::Output;

// ============================================================================
// CLI Definition
// ============================================================================

/// Notte CLI - browser automation, AI agents and web scraping.
#[derive(Parser)]
#[command(name = "notte")]
#[command(about = "CLI for the notte.cc browser agent platform")]
#[command(long_about = r#"
notte provides command-line access to the notte.cc platform
for browser automation, AI agents, and web scraping.

Get started:
  notte auth login        # Authenticate with your API key
  notte sessions start    # Start a browser session
  notte scrape <url>      # Quick scrape a webpage
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// API request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Skip confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Login, logout, and check authentication status.
    Auth(auth::AuthArgs),

    /// Manage the local configuration file.
    Config(config::ConfigArgs),

    /// Check API health status.
    Health,

    /// Show API usage statistics.
    Usage(usage::UsageArgs),

    /// Manage browser sessions.
    Sessions(sessions::SessionsArgs),

    /// Run actions on a session's current page.
    Page(page::PageArgs),

    /// Manage AI agents.
    Agents(agents::AgentsArgs),

    /// Manage credential vaults.
    Vaults(vaults::VaultsArgs),

    /// Manage personas (email, phone and vault identities).
    Personas(personas::PersonasArgs),

    /// Manage browser profiles.
    Profiles(profiles::ProfilesArgs),

    /// Upload, list and download files.
    Files(files::FilesArgs),

    /// Scrape a webpage.
    Scrape(scrape::ScrapeArgs),

    /// Scrape content from a local HTML file.
    ScrapeHtml(scrape::ScrapeHtmlArgs),

    /// Manage functions.
    Functions(functions::FunctionsArgs),

    /// Manage workflows.
    Workflows(functions::FunctionsArgs),

    /// Print version information.
    Version,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// Any failure.
    Error = 1,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool) {
    let default = if verbose { "notte=debug" } else { "notte=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Auth(args) => auth::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
        Commands::Health => health::run(&cli).await,
        Commands::Usage(args) => usage::run(args, &cli).await,
        Commands::Sessions(args) => sessions::run(args, &cli).await,
        Commands::Page(args) => page::run(args, &cli).await,
        Commands::Agents(args) => agents::run(args, &cli).await,
        Commands::Vaults(args) => vaults::run(args, &cli).await,
        Commands::Personas(args) => personas::run(args, &cli).await,
        Commands::Profiles(args) => profiles::run(args, &cli).await,
        Commands::Files(args) => files::run(args, &cli).await,
        Commands::Scrape(args) => scrape::run(args, &cli).await,
        Commands::ScrapeHtml(args) => scrape::run_html(args, &cli).await,
        Commands::Functions(args) => functions::run(functions::Resource::Functions, args, &cli).await,
        Commands::Workflows(args) => functions::run(functions::Resource::Workflows, args, &cli).await,
        Commands::Version => print_version(),
    };

    if let Err(e) = result {
        Output::from_cli(&cli).print_error(&e);
        std::process::exit(ExitCode::Error as i32);
    }
}

fn print_version() -> Result<()> {
    println!("notte version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
