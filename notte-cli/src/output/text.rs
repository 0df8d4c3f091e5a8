//! Text output formatting with aligned labels and colors.

use serde_json::{Map, Value};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Gap between a label column and its value.
const PADDING: usize = 2;

/// Text formatter with optional colors.
///
/// Payloads are rendered from their JSON shape: objects become `key: value`
/// blocks, lists print their items separated by a blank line and scalars
/// print as-is.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Renders a payload. The result ends with a newline unless it is empty.
    pub fn format(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value);
        out
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Null => out.push_str("<nil>\n"),
            Value::Object(fields) => self.write_fields(out, fields),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    self.write_value(out, item);
                }
            }
            scalar => {
                out.push_str(&inline(scalar));
                out.push('\n');
            }
        }
    }

    fn write_fields(&self, out: &mut String, fields: &Map<String, Value>) {
        let rows: Vec<(String, String)> = fields
            .iter()
            .filter(|(_, value)| !is_blank(value))
            .map(|(key, value)| (format!("{key}:"), inline(value)))
            .collect();

        let width = rows
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        for (label, value) in rows {
            let pad = width - label.chars().count() + PADDING;
            out.push_str(&self.cyan(&label));
            out.push_str(&" ".repeat(pad));
            out.push_str(&value);
            out.push('\n');
        }
    }

    /// Renders rows as aligned columns under colored headers.
    ///
    /// Cells are looked up by header name; missing cells are left blank.
    pub fn format_table(&self, headers: &[&str], rows: &[Map<String, Value>]) -> String {
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|header| row.get(*header).map(inline).unwrap_or_default())
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header_cells: Vec<String> = headers.iter().map(ToString::to_string).collect();
        self.write_row(&mut out, &header_cells, &widths, true);
        for row in &cells {
            self.write_row(&mut out, row, &widths, false);
        }
        out
    }

    fn write_row(&self, out: &mut String, cells: &[String], widths: &[usize], header: bool) {
        let last = cells.len().saturating_sub(1);
        for (i, cell) in cells.iter().enumerate() {
            if header {
                out.push_str(&self.cyan(cell));
            } else {
                out.push_str(cell);
            }
            if i < last {
                out.push_str(&" ".repeat(widths[i] - cell.chars().count() + PADDING));
            }
        }
        out.push('\n');
    }

    /// Renders an error line: `Error <status>: <msg>` or `Error: <msg>`.
    pub fn format_error(&self, message: &str, status: Option<u16>) -> String {
        let label = match status {
            Some(status) => format!("Error {status}:"),
            None => "Error:".to_string(),
        };
        format!("{} {message}\n", self.red(&label))
    }

    fn cyan(&self, text: &str) -> String {
        if self.use_colors {
            format!("{CYAN}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        if self.use_colors {
            format!("{RED}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Single-line rendering of a value: strings verbatim, containers as JSON.
pub fn inline(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        container => container.to_string(),
    }
}

/// Null values and empty containers are left out of key/value blocks.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}
