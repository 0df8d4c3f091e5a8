//! Output formatting for CLI.
//!
//! [`Output`] picks the text or JSON formatter from the global flags and
//! decides which stream each kind of message goes to: payloads on stdout,
//! errors on stderr, and informational lines on stdout in text mode but
//! stderr in JSON mode so stdout stays parseable.

mod json;
mod text;

use std::io::{IsTerminal, Write};

use anyhow::{Result, bail};
use notte_core::{ApiError, ScrapeResponse};
use notte_fetch::FetchError;
use serde::Serialize;
use serde_json::{Map, Value};

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::{Cli, OutputFormat};

/// Renders payloads, results and errors in the selected format.
pub struct Output {
    format: OutputFormat,
    text: TextFormatter,
    json: JsonFormatter,
}

impl Output {
    /// Creates an output for an explicit format and color choice.
    pub fn new(format: OutputFormat, use_colors: bool) -> Self {
        Self {
            format,
            text: TextFormatter::new(use_colors),
            json: JsonFormatter::new(),
        }
    }

    /// Output configured from the global flags. Colors are off under
    /// `--no-color` and when stdout is not a terminal.
    pub fn from_cli(cli: &Cli) -> Self {
        let use_colors = !cli.no_color && std::io::stdout().is_terminal();
        Self::new(cli.output, use_colors)
    }

    /// Whether JSON output was requested.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Renders any serializable payload.
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json.format(data),
            OutputFormat::Text => Ok(self.text.format(&serde_json::to_value(data)?)),
        }
    }

    /// Renders rows under headers. JSON mode emits the rows as an array.
    pub fn render_table(&self, headers: &[&str], rows: &[Map<String, Value>]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.json.format(rows),
            OutputFormat::Text => Ok(self.text.format_table(headers, rows)),
        }
    }

    /// Renders the outcome of an action.
    ///
    /// Text mode shows only `message`; JSON mode shows `data` with a
    /// `message` key added when it has none. Returns `None` when there is
    /// nothing to print.
    pub fn render_result(&self, message: &str, data: Value) -> Result<Option<String>> {
        if self.is_json() {
            let mut data = match data {
                Value::Null => Value::Object(Map::new()),
                other => other,
            };
            if let Value::Object(fields) = &mut data {
                if !message.is_empty() && !fields.contains_key("message") {
                    fields.insert("message".to_string(), Value::String(message.to_string()));
                }
            }
            return self.json.format(&data).map(Some);
        }

        if message.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{message}\n")))
    }

    /// Handles the empty-list case.
    ///
    /// Returns the rendering for a null or empty list (`[]` in JSON mode,
    /// `empty_message` in text mode), or `None` when the list has items and
    /// the caller should render it itself.
    ///
    /// # Errors
    ///
    /// Fails when `items` does not serialize to a list or null.
    pub fn render_empty_list<T: Serialize + ?Sized>(
        &self,
        items: &T,
        empty_message: &str,
    ) -> Result<Option<String>> {
        match serde_json::to_value(items)? {
            Value::Null => {}
            Value::Array(items) if items.is_empty() => {}
            Value::Array(_) => return Ok(None),
            other => bail!("expected a list, got {}", kind_name(&other)),
        }

        if self.is_json() {
            return Ok(Some("[]\n".to_string()));
        }
        if empty_message.is_empty() {
            return Ok(Some(String::new()));
        }
        Ok(Some(format!("{empty_message}\n")))
    }

    /// Renders a scrape result.
    ///
    /// JSON mode prints the whole response. Text mode prints the markdown,
    /// or with instructions the extracted data.
    ///
    /// # Errors
    ///
    /// Fails when the extraction reports `success: false`.
    pub fn render_scrape(&self, response: &ScrapeResponse, has_instructions: bool) -> Result<String> {
        if self.is_json() {
            return self.render(response);
        }
        if !has_instructions {
            return Ok(format!("{}\n", response.markdown.as_deref().unwrap_or_default()));
        }

        match &response.structured {
            Some(structured) if !structured.success => {
                let reason = structured.error.as_deref().filter(|e| !e.is_empty());
                bail!("{}", reason.unwrap_or("scrape failed"));
            }
            Some(structured) => match &structured.data {
                Some(data) => self.render(data),
                None => self.render(structured),
            },
            None => self.render(&Value::Null),
        }
    }

    /// Renders an error for stderr.
    ///
    /// API errors with a status show as `Error <status>: <msg>` (text) or
    /// `{"error": msg, "status_code": status}` (JSON); anything else as
    /// `Error: <msg>` or `{"error": msg}`.
    pub fn render_error(&self, err: &anyhow::Error) -> String {
        let (message, status) = match find_api_error(err) {
            Some(ApiError::Api {
                status: Some(status),
                message,
                ..
            }) if !message.is_empty() => (message.clone(), Some(*status)),
            _ => (format!("{err:#}"), None),
        };

        match self.format {
            OutputFormat::Json => self.json.format_error(&message, status),
            OutputFormat::Text => self.text.format_error(&message, status),
        }
    }

    // ------------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------------

    /// Prints a payload to stdout.
    pub fn print<T: Serialize + ?Sized>(&self, data: &T) -> Result<()> {
        write_stdout(&self.render(data)?)
    }

    /// Prints a table to stdout.
    pub fn print_table(&self, headers: &[&str], rows: &[Map<String, Value>]) -> Result<()> {
        write_stdout(&self.render_table(headers, rows)?)
    }

    /// Prints an informational line: stdout in text mode, stderr in JSON mode.
    pub fn info(&self, message: &str) {
        if self.is_json() {
            eprintln!("{message}");
        } else {
            println!("{message}");
        }
    }

    /// Prints the outcome of an action. See [`Output::render_result`].
    pub fn print_result(&self, message: &str, data: Value) -> Result<()> {
        match self.render_result(message, data)? {
            Some(rendered) => write_stdout(&rendered),
            None => Ok(()),
        }
    }

    /// Prints the empty-list rendering if `items` is empty.
    ///
    /// Returns `true` when it printed, `false` when the caller should print
    /// the items.
    pub fn print_list_or_empty<T: Serialize + ?Sized>(
        &self,
        items: &T,
        empty_message: &str,
    ) -> Result<bool> {
        match self.render_empty_list(items, empty_message)? {
            Some(rendered) => {
                write_stdout(&rendered)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Prints a list, or `empty_message` when it has no items.
    pub fn print_list<T: Serialize + ?Sized>(&self, items: &T, empty_message: &str) -> Result<()> {
        if self.print_list_or_empty(items, empty_message)? {
            return Ok(());
        }
        self.print(items)
    }

    /// Prints a scrape result. See [`Output::render_scrape`].
    pub fn print_scrape(&self, response: &ScrapeResponse, has_instructions: bool) -> Result<()> {
        write_stdout(&self.render_scrape(response, has_instructions)?)
    }

    /// Prints an error to stderr.
    pub fn print_error(&self, err: &anyhow::Error) {
        eprint!("{}", self.render_error(err));
    }
}

/// The API error somewhere in `err`'s chain, if any.
pub fn find_api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<ApiError>()
            .or_else(|| cause.downcast_ref::<FetchError>().and_then(FetchError::api_error))
    })
}

fn write_stdout(rendered: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
