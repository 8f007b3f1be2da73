//! Formatters turning log entries into their persisted representation
//!
//! - [`TraditionalFormatter`]: bracketed text lines
//! - [`DelimitedFormatter`]: CSV rows with a static or metadata-derived header
//! - [`TabularFormatter`]: JSON row objects consumed by the spreadsheet writer
//!
//! Every formatted entry ends with a newline, so bulk output is a plain
//! concatenation and line count equals entry count.

pub mod delimited;
pub mod tabular;
pub mod traditional;

pub use delimited::DelimitedFormatter;
pub use tabular::TabularFormatter;
pub use traditional::TraditionalFormatter;

use crate::core::{BulkLogEntry, FileType, LogEntry};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Header state of a formatter
///
/// Starts `Static`; the first `format_header(true, ..)` with a sample carrying
/// metadata freezes the sample's key order as the header. Only
/// [`LogFormatter::reset_dynamic_mode`] leaves `Dynamic`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderMode {
    #[default]
    Static,
    Dynamic(Vec<String>),
}

impl HeaderMode {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, HeaderMode::Dynamic(_))
    }

    /// Switch to dynamic mode using the sample's metadata keys.
    ///
    /// No-op when already dynamic or when the sample carries no metadata.
    pub fn activate(&mut self, sample: Option<&LogEntry>) {
        if self.is_dynamic() {
            return;
        }
        if let Some(metadata) = sample.and_then(LogEntry::metadata) {
            *self = HeaderMode::Dynamic(metadata.keys().cloned().collect());
        }
    }

    pub fn dynamic_keys(&self) -> Option<&[String]> {
        match self {
            HeaderMode::Dynamic(keys) => Some(keys),
            HeaderMode::Static => None,
        }
    }
}

/// Shared contract of the three formatters
pub trait LogFormatter: Send + Sync {
    /// Representation this formatter produces
    fn file_type(&self) -> FileType;

    /// Format one entry, stamped with `timestamp` or the current moment.
    fn format_entry(&self, entry: &LogEntry, timestamp: Option<DateTime<Utc>>) -> String;

    /// Header text for the current mode, switching to dynamic mode first when
    /// `dynamic` is set and `sample` carries metadata.
    fn format_header(&mut self, dynamic: bool, sample: Option<&LogEntry>) -> String;

    /// Entries formatted in input order
    fn format_bulk_entries(&self, entries: &[BulkLogEntry]) -> String {
        entries
            .iter()
            .map(|bulk| self.format_entry(&bulk.entry, bulk.timestamp))
            .collect()
    }

    fn supports_append(&self) -> bool {
        self.file_type().supports_append()
    }

    /// An entry is valid when it has a level and a non-empty message
    fn validate_entry(&self, entry: &LogEntry) -> bool {
        !entry.message.is_empty()
    }

    /// Column names of the current header
    fn current_headers(&self) -> Vec<String>;

    fn reset_dynamic_mode(&mut self);

    fn is_dynamic(&self) -> bool;
}

/// Construct the formatter for a representation
pub fn formatter_for(file_type: FileType) -> Box<dyn LogFormatter> {
    match file_type {
        FileType::Log => Box::new(TraditionalFormatter::new()),
        FileType::Csv => Box::new(DelimitedFormatter::new()),
        FileType::Xlsx => Box::new(TabularFormatter::new()),
    }
}

/// Text of a metadata value as it should appear in a single cell
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quote a delimited field when it contains a comma, quote, newline or carriage return
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// `user_id` / `requestCount` / `retry-after` -> `User Id` / `Request Count` / `Retry After`
pub fn title_case(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("cr\rhere"), "\"cr\rhere\"");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("user_id"), "User Id");
        assert_eq!(title_case("requestCount"), "Request Count");
        assert_eq!(title_case("retry-after"), "Retry After");
        assert_eq!(title_case("userID"), "User ID");
        assert_eq!(title_case("amount"), "Amount");
        assert_eq!(title_case("http2Status"), "Http2 Status");
    }

    #[test]
    fn test_header_mode_freezes_first_sample() {
        let mut mode = HeaderMode::default();
        mode.activate(Some(&LogEntry::new(LogLevel::Info, "no metadata")));
        assert_eq!(mode, HeaderMode::Static);

        let first = LogEntry::new(LogLevel::Info, "a")
            .with_field("b", 1)
            .with_field("a", 2);
        mode.activate(Some(&first));

        let second = LogEntry::new(LogLevel::Info, "b").with_field("z", 1);
        mode.activate(Some(&second));

        assert_eq!(mode.dynamic_keys().unwrap(), ["b", "a"]);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&Value::from("x")), "x");
        assert_eq!(cell_text(&Value::from(42)), "42");
        assert_eq!(cell_text(&serde_json::json!({"k": 1})), "{\"k\":1}");
    }

    #[test]
    fn test_formatter_for_matches_file_type() {
        for file_type in FileType::ALL {
            let formatter = formatter_for(file_type);
            assert_eq!(formatter.file_type(), file_type);
            assert_eq!(formatter.supports_append(), file_type.supports_append());
        }
    }
}
