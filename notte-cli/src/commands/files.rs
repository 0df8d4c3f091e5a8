//! Files command - session file storage.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use notte_fetch::MultipartFactory;
use notte_fetch::multipart::{Form, Part};
use notte_store::ProcessEnv;
use serde_json::{Value, json};
use tracing::debug;

use super::Api;
use super::input::resolve_session_id;
use crate::Cli;
use crate::output::Output;

/// Arguments for the files command.
#[derive(Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub action: FilesAction,
}

/// Files subcommands.
#[derive(Subcommand)]
pub enum FilesAction {
    /// List uploaded files, or files downloaded by a session.
    List {
        /// List uploaded files (default).
        #[arg(long, conflicts_with = "downloads")]
        uploads: bool,

        /// List files downloaded by a session.
        #[arg(long)]
        downloads: bool,

        /// Session ID (defaults to NOTTE_SESSION_ID).
        #[arg(long)]
        id: Option<String>,
    },

    /// Upload a file to storage.
    Upload {
        /// Path of the file to upload.
        path: PathBuf,
    },

    /// Download a file saved by a session.
    Download {
        /// Name of the file in session storage.
        filename: String,

        /// Session ID (defaults to NOTTE_SESSION_ID).
        #[arg(long)]
        id: Option<String>,

        /// Destination path (defaults to the file name in the current directory).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Runs the files command.
pub async fn run(args: &FilesArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        FilesAction::List { downloads, id, .. } => {
            if *downloads {
                let session = resolve_session_id(id.as_deref(), &ProcessEnv)?;
                list_downloads(&session, cli).await
            } else {
                list_uploads(cli).await
            }
        }
        FilesAction::Upload { path } => upload(path, cli).await,
        FilesAction::Download { filename, id, out } => {
            let session = resolve_session_id(id.as_deref(), &ProcessEnv)?;
            download(&session, filename, out.as_deref(), cli).await
        }
    }
}

async fn list_uploads(cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let listing = api.send_value(api.client.get(&["storage", "uploads"])).await?;
    Output::from_cli(cli).print_list(&file_names(&listing), "No uploaded files.")
}

async fn list_downloads(session: &str, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let listing = api
        .send_value(api.client.get(&["storage", session, "downloads"]))
        .await?;
    Output::from_cli(cli).print_list(&file_names(&listing), "No downloaded files in session.")
}

/// The `files` array of a storage listing.
fn file_names(listing: &Value) -> Vec<Value> {
    listing
        .get("files")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

async fn upload(path: &Path, cli: &Cli) -> Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .context("failed to access file")?;
    if metadata.is_dir() {
        bail!("path is a directory, not a file: {}", path.display());
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("invalid file path: {}", path.display()))?;
    let data = tokio::fs::read(path).await.context("failed to open file")?;
    debug!(file = %filename, bytes = data.len(), "Uploading file");

    let api = Api::connect(cli).await?;
    let form = file_form(filename.clone(), data);
    let result = api
        .send_value(
            api.client
                .post(&["storage", "uploads", &filename])
                .multipart(form),
        )
        .await?;

    let output = Output::from_cli(cli);
    if output.is_json() {
        return output.print(&result);
    }
    output.print_result(
        &format!("File uploaded successfully: {filename}"),
        json!({"filename": filename}),
    )
}

/// A multipart form with the bytes under the `file` field.
pub fn file_form(filename: String, data: Vec<u8>) -> MultipartFactory {
    file_form_with(filename, data, Vec::new())
}

/// Like [`file_form`], with extra text fields appended after the file.
pub fn file_form_with(
    filename: String,
    data: Vec<u8>,
    fields: Vec<(&'static str, String)>,
) -> MultipartFactory {
    MultipartFactory::new(move || {
        let part = Part::bytes(data.clone()).file_name(filename.clone());
        fields
            .iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(*name, value.clone())
            })
    })
}

async fn download(session: &str, filename: &str, out: Option<&Path>, cli: &Cli) -> Result<()> {
    let api = Api::connect(cli).await?;
    let response = api
        .send(
            api.client
                .get(&["storage", session, "downloads", filename]),
        )
        .await?;

    let target = out.map_or_else(|| PathBuf::from(filename), Path::to_path_buf);
    tokio::fs::write(&target, &response.body)
        .await
        .context("failed to write file")?;

    let shown = target.display().to_string();
    Output::from_cli(cli).print_result(
        &format!("File downloaded successfully: {shown}"),
        json!({"path": shown, "size": response.body.len()}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct FilesCli {
        #[command(subcommand)]
        action: FilesAction,
    }

    #[test]
    fn test_file_names() {
        let listing = json!({"files": ["a.pdf", "b.csv"]});
        assert_eq!(file_names(&listing), vec![json!("a.pdf"), json!("b.csv")]);
        assert!(file_names(&json!({})).is_empty());
    }

    #[test]
    fn test_uploads_and_downloads_conflict() {
        assert!(FilesCli::try_parse_from(["files", "list", "--uploads", "--downloads"]).is_err());
        assert!(FilesCli::try_parse_from(["files", "list", "--downloads", "--id", "s1"]).is_ok());
    }

    #[test]
    fn test_download_requires_filename() {
        assert!(FilesCli::try_parse_from(["files", "download"]).is_err());
    }
}
