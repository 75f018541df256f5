//! Error rendering for the CLI.
//!
//! Robot formats get a structured JSON object; human output is a short
//! colored line plus an optional hint.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::WatchError;

/// Structured error for machine consumers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorJson {
    pub error: bool,
    pub code: &'static str,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub exit_code: i32,
}

impl ErrorJson {
    #[must_use]
    pub fn from_error(error: &WatchError) -> Self {
        Self {
            error: true,
            code: error.error_code(),
            category: error.category().description().to_string(),
            message: error.to_string(),
            suggestion: error.suggestion(),
            exit_code: error.exit_code().into(),
        }
    }
}

/// Render an error in the requested format.
#[must_use]
pub fn render_error(error: &WatchError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Md => render_error_json(error, true),
        OutputFormat::Human => render_error_human(error, no_color),
    }
}

#[must_use]
pub fn render_error_json(error: &WatchError, pretty: bool) -> String {
    let json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.unwrap_or_else(|_| render_error_human(error, true))
}

#[must_use]
pub fn render_error_human(error: &WatchError, no_color: bool) -> String {
    let head = format!("error[{}]", error.error_code());
    let mut out = if no_color {
        format!("{head}: {error}")
    } else {
        format!("{}: {error}", head.red().bold())
    };
    if let Some(hint) = error.suggestion() {
        out.push('\n');
        if no_color {
            out.push_str(&format!("  hint: {hint}"));
        } else {
            out.push_str(&format!("  {} {hint}", "hint:".cyan()));
        }
    }
    out
}
