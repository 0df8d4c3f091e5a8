//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

/// JSON formatter. One compact document per payload, newline terminated.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new() -> Self {
        Self
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let mut json = serde_json::to_string(data)?;
        json.push('\n');
        Ok(json)
    }

    /// Formats an error object: `{"error": .., "status_code": ..}`, the
    /// status omitted when unknown.
    pub fn format_error(&self, message: &str, status: Option<u16>) -> String {
        let body = match status {
            Some(status) => json!({ "error": message, "status_code": status }),
            None => json!({ "error": message }),
        };
        format!("{body}\n")
    }
}
