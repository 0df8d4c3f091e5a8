//! Scrape commands - one-shot scraping without a managed session.

use anyhow::{Context, Result};
use clap::Args;
use notte_core::ScrapeResponse;
use serde_json::{Value, json};

use super::sessions::scrape_body;
use super::{Api, non_empty, object_from};
use crate::Cli;
use crate::output::Output;

/// Arguments for `scrape`.
#[derive(Args)]
pub struct ScrapeArgs {
    /// URL to scrape.
    pub url: String,

    /// Extraction instructions.
    #[arg(long)]
    pub instructions: Option<String>,

    /// Only scrape main content.
    #[arg(long)]
    pub only_main_content: bool,
}

/// Arguments for `scrape-html`.
#[derive(Args)]
pub struct ScrapeHtmlArgs {
    /// Path to an HTML file.
    #[arg(long)]
    pub file: String,

    /// Extraction instructions.
    #[arg(long)]
    pub instructions: Option<String>,
}

/// Scrapes a URL.
pub async fn run(args: &ScrapeArgs, cli: &Cli) -> Result<()> {
    let mut body = scrape_body(args.instructions.as_ref(), args.only_main_content);
    if let Value::Object(fields) = &mut body {
        fields.insert("url".to_string(), json!(args.url));
    }

    let api = Api::connect(cli).await?;
    let response: ScrapeResponse = api
        .send_json(api.client.post(&["scrape"]).json(&body))
        .await?;
    Output::from_cli(cli).print_scrape(&response, body.get("instructions").is_some())
}

/// Scrapes a local HTML file.
pub async fn run_html(args: &ScrapeHtmlArgs, cli: &Cli) -> Result<()> {
    let html = tokio::fs::read_to_string(&args.file)
        .await
        .context("failed to read HTML file")?;
    let body = html_body(&args.file, html, args.instructions.as_ref());

    let api = Api::connect(cli).await?;
    let response = api
        .send_value(api.client.post(&["scrape_from_html"]).json(&body))
        .await?;

    let output = Output::from_cli(cli);
    match response.get("scrape") {
        Some(scrape) if !output.is_json() => output.print(scrape),
        _ => output.print(&response),
    }
}

fn html_body(path: &str, html: String, instructions: Option<&String>) -> Value {
    let frames = json!([{"frame_data": html, "frame_url": format!("file://{path}")}]);
    object_from([
        ("frames", Some(frames)),
        ("instructions", non_empty(instructions)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_body_wraps_single_frame() {
        let body = html_body("/tmp/page.html", "<p>hi</p>".to_string(), None);
        assert_eq!(
            body,
            json!({"frames": [{"frame_data": "<p>hi</p>", "frame_url": "file:///tmp/page.html"}]})
        );
    }

    #[test]
    fn test_html_body_with_instructions() {
        let instructions = "list the links".to_string();
        let body = html_body("page.html", String::new(), Some(&instructions));
        assert_eq!(body["instructions"], "list the links");
        assert_eq!(body["frames"][0]["frame_url"], "file://page.html");
    }
}
