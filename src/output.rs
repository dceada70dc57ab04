//! Output rendering: tables, JSON, and styled announcements.
//!
//! The JSON/table choice is captured once per invocation from the parsed
//! arguments and threaded through explicitly; nothing reads ambient state.
//! In JSON mode every styled write is suppressed so stdout stays
//! machine-parseable.

use std::io::Write;

use console::style;
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::resources::Renderable;

/// Per-invocation rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Result of a command handler, tagged by shape so the formatter can pick a
/// rendering branch.
pub enum Payload {
    Empty,
    /// Written verbatim.
    Text(String),
    /// Single resource: one-row table or a JSON object.
    One(Box<dyn Renderable>),
    /// Resource list: table or JSON array.
    Many(Vec<Box<dyn Renderable>>),
    /// Unshaped server response (`--detail` dumps); always pretty JSON.
    Raw(Value),
}

// Shape-only formatting; trait objects carry no useful detail and raw
// values may hold tokens.
impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::One(_) => write!(f, "One"),
            Self::Many(items) => f.debug_tuple("Many").field(&items.len()).finish(),
            Self::Raw(_) => write!(f, "Raw"),
        }
    }
}

impl Payload {
    pub fn one(resource: impl Renderable + 'static) -> Self {
        Self::One(Box::new(resource))
    }

    pub fn many<T: Renderable + 'static>(resources: Vec<T>) -> Self {
        Self::Many(
            resources
                .into_iter()
                .map(|r| Box::new(r) as Box<dyn Renderable>)
                .collect(),
        )
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Renders command results and styled announcements.
#[derive(Debug)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn json_mode(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write the payload: stdout on success, stderr on failure, nothing at
    /// all for an empty payload.
    pub fn render(&self, success: bool, payload: &Payload) {
        let Some(text) = self.format_payload(payload) else {
            return;
        };
        if success {
            let _ = writeln!(std::io::stdout(), "{text}");
        } else {
            let _ = writeln!(std::io::stderr(), "{text}");
        }
    }

    /// Format without writing. `None` means nothing should be written.
    pub fn format_payload(&self, payload: &Payload) -> Option<String> {
        let text = match payload {
            Payload::Empty => return None,
            Payload::Text(text) => text.clone(),
            Payload::One(resource) => match self.format {
                OutputFormat::Json => pretty_json(&resource.to_json()),
                OutputFormat::Table => format_table(&[resource.table_row()]),
            },
            Payload::Many(resources) => {
                // Empty lists write nothing in either mode.
                if resources.is_empty() {
                    return None;
                }
                match self.format {
                    OutputFormat::Json => {
                        let items: Vec<Value> = resources.iter().map(|r| r.to_json()).collect();
                        pretty_json(&Value::Array(items))
                    }
                    OutputFormat::Table => {
                        let rows: Vec<Vec<(String, String)>> =
                            resources.iter().map(|r| r.table_row()).collect();
                        format_table(&rows)
                    }
                }
            }
            Payload::Raw(value) => pretty_json(value),
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Styled action announcement; suppressed in JSON mode.
    pub fn announce(&self, message: &str) {
        if !self.json_mode() {
            println!("{}", style(message).bold());
        }
    }

    /// `prefix` plain, `value` highlighted; suppressed in JSON mode.
    pub fn important_value(&self, prefix: &str, value: &str) {
        if !self.json_mode() {
            println!("{}{}", prefix, style(value).green().bold());
        }
    }

    /// Clickable link line; suppressed in JSON mode.
    pub fn link(&self, prefix: &str, url: &str) {
        if !self.json_mode() {
            println!("{}{}", prefix, style(url).blue().underlined());
        }
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Mask a token for display, keeping only the last four characters.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("*********{tail}")
}

/// Render rows as an aligned table.
///
/// The header is the union of keys across rows in first-seen order, so
/// heterogeneous rows tabulate predictably. Column width is
/// max(header + 2, widest cell); columns are separated by two spaces and a
/// dash rule sits under the header. No rows, no output.
pub fn format_table(rows: &[Vec<(String, String)>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for (key, _) in row {
            if !headers.iter().any(|h| h == key) {
                headers.push(key);
            }
        }
    }

    let cell = |row: &[(String, String)], header: &str| -> String {
        row.iter()
            .find(|(key, _)| key == header)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| h.width() + 2).collect();
    for row in rows {
        for (i, header) in headers.iter().enumerate() {
            widths[i] = widths[i].max(cell(row, header).width());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_line(headers.iter().map(|h| h.to_string()), &widths));
    lines.push(render_line(widths.iter().map(|w| "-".repeat(*w)), &widths));
    for row in rows {
        lines.push(render_line(headers.iter().map(|h| cell(row, h)), &widths));
    }
    lines.join("\n")
}

fn render_line(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        line.push_str(&cell);
        let pad = widths[i].saturating_sub(cell.width()) + 2;
        line.extend(std::iter::repeat(' ').take(pad));
    }
    line.trim_end().to_string()
}
