//! Log file formats

use std::path::Path;

/// Supported log file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// One JSON object per line
    JsonLines,
}

impl LogFormat {
    /// Detect format from file extension; anything unrecognised is CSV
    pub fn from_extension(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jsonl") | Some("ndjson") => LogFormat::JsonLines,
            _ => LogFormat::Csv,
        }
    }
}

/// Quote a CSV field if it contains a separator, quote or line break
pub(crate) fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV row (without the line terminator)
pub(crate) fn csv_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}
