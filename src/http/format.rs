//! Output representation negotiation from the `Accept` header.

use std::fmt;

use axum::http::header::{HeaderMap, ACCEPT};

/// `Accept` marker selecting a spreadsheet export.
pub const XLS_HEADER: &str = "application/xls";

/// `Accept` marker selecting a JSON body.
pub const JSON_HEADER: &str = "application/json";

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Xls,
    Json,
}

impl OutputFormat {
    /// File extension of an export in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xls => "xls",
            OutputFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Csv => CSV_CONTENT_TYPE,
            OutputFormat::Xls => XLS_HEADER,
            OutputFormat::Json => JSON_HEADER,
        }
    }

    /// Whether an export file exists for this format.
    pub fn is_file_export(self) -> bool {
        !matches!(self, OutputFormat::Json)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Csv => "CSV",
            OutputFormat::Xls => "XLS",
            OutputFormat::Json => "JSON",
        })
    }
}

/// Classify an `Accept` value. XLS wins over JSON; anything else, including
/// an absent header, is CSV.
pub fn determine_output_format(accept: Option<&str>) -> OutputFormat {
    match accept {
        Some(value) if value.contains(XLS_HEADER) => OutputFormat::Xls,
        Some(value) if value.contains(JSON_HEADER) => OutputFormat::Json,
        _ => OutputFormat::Csv,
    }
}

/// [`determine_output_format`] over a request's headers. A non-ASCII
/// `Accept` value is treated as absent.
pub fn output_format_from_headers(headers: &HeaderMap) -> OutputFormat {
    determine_output_format(headers.get(ACCEPT).and_then(|v| v.to_str().ok()))
}
