//! CSV rows
//!
//! Static mode writes the seven system columns. Dynamic mode writes only the
//! metadata values, in the order of the frozen header; an entry without
//! metadata falls back to a full static row.

use super::{cell_text, escape_field, HeaderMode, LogFormatter};
use crate::core::{timestamp, FileType, LogEntry};
use chrono::{DateTime, Utc};

pub const STATIC_HEADERS: [&str; 7] = [
    "timestamp",
    "level",
    "requestId",
    "userId",
    "sessionId",
    "message",
    "metadata",
];

#[derive(Debug, Clone, Default)]
pub struct DelimitedFormatter {
    mode: HeaderMode,
}

impl DelimitedFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn join_row<I, S>(fields: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut row = fields
            .into_iter()
            .map(|field| escape_field(field.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        row.push('\n');
        row
    }

    fn static_row(entry: &LogEntry, timestamp: DateTime<Utc>) -> String {
        let metadata = entry
            .metadata()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_default();
        let stamp = timestamp::iso8601(&timestamp);

        Self::join_row([
            stamp.as_str(),
            entry.level.to_str(),
            entry.request_id.as_deref().unwrap_or(""),
            entry.user_id.as_deref().unwrap_or(""),
            entry.session_id.as_deref().unwrap_or(""),
            entry.message.as_str(),
            metadata.as_str(),
        ])
    }
}

impl LogFormatter for DelimitedFormatter {
    fn file_type(&self) -> FileType {
        FileType::Csv
    }

    fn format_entry(&self, entry: &LogEntry, timestamp: Option<DateTime<Utc>>) -> String {
        let timestamp = timestamp.unwrap_or_else(Utc::now);

        match (self.mode.dynamic_keys(), entry.metadata()) {
            (Some(keys), Some(metadata)) => Self::join_row(
                keys.iter()
                    .map(|key| metadata.get(key).map(cell_text).unwrap_or_default()),
            ),
            _ => Self::static_row(entry, timestamp),
        }
    }

    fn format_header(&mut self, dynamic: bool, sample: Option<&LogEntry>) -> String {
        if dynamic {
            self.mode.activate(sample);
        }
        Self::join_row(self.current_headers())
    }

    fn current_headers(&self) -> Vec<String> {
        match self.mode.dynamic_keys() {
            Some(keys) => keys.to_vec(),
            None => STATIC_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    fn reset_dynamic_mode(&mut self) {
        self.mode = HeaderMode::Static;
    }

    fn is_dynamic(&self) -> bool {
        self.mode.is_dynamic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_static_header() {
        let mut formatter = DelimitedFormatter::new();
        assert_eq!(
            formatter.format_header(false, None),
            "timestamp,level,requestId,userId,sessionId,message,metadata\n"
        );
    }

    #[test]
    fn test_static_row() {
        let entry = LogEntry::new(LogLevel::Info, "Order created")
            .with_user_id("u-1")
            .with_field("orderId", "o-5");
        let row = DelimitedFormatter::new().format_entry(&entry, Some(at()));
        assert_eq!(
            row,
            "2024-05-01T12:00:00.000Z,INFO,,u-1,,Order created,\"{\"\"orderId\"\":\"\"o-5\"\"}\"\n"
        );
    }

    #[test]
    fn test_message_with_comma_and_quote_is_quoted() {
        let entry = LogEntry::new(LogLevel::Warn, "Hello, \"world\"");
        let row = DelimitedFormatter::new().format_entry(&entry, Some(at()));
        assert!(row.contains(",\"Hello, \"\"world\"\"\","));
    }

    #[test]
    fn test_dynamic_header_and_rows() {
        let mut formatter = DelimitedFormatter::new();
        let sample = LogEntry::new(LogLevel::Info, "first")
            .with_field("orderId", "o-1")
            .with_field("amount", 10.5)
            .with_field("note", "a,b");

        let header = formatter.format_header(true, Some(&sample));
        assert_eq!(header, "orderId,amount,note\n");
        assert!(formatter.is_dynamic());

        assert_eq!(
            formatter.format_entry(&sample, Some(at())),
            "o-1,10.5,\"a,b\"\n"
        );

        // Missing keys become empty fields, extra keys are dropped
        let partial = LogEntry::new(LogLevel::Info, "second")
            .with_field("amount", 3)
            .with_field("unexpected", true);
        assert_eq!(formatter.format_entry(&partial, Some(at())), ",3,\n");
    }

    #[test]
    fn test_dynamic_without_metadata_falls_back_to_static_row() {
        let mut formatter = DelimitedFormatter::new();
        let sample = LogEntry::new(LogLevel::Info, "first").with_field("k", 1);
        formatter.format_header(true, Some(&sample));

        let bare = LogEntry::new(LogLevel::Error, "no metadata");
        let row = formatter.format_entry(&bare, Some(at()));
        assert_eq!(row, "2024-05-01T12:00:00.000Z,ERROR,,,,no metadata,\n");
    }

    #[test]
    fn test_dynamic_request_without_metadata_keeps_static_header() {
        let mut formatter = DelimitedFormatter::new();
        let sample = LogEntry::new(LogLevel::Info, "first");
        let header = formatter.format_header(true, Some(&sample));
        assert!(header.starts_with("timestamp,level"));
        assert!(!formatter.is_dynamic());
    }

    #[test]
    fn test_reset_dynamic_mode() {
        let mut formatter = DelimitedFormatter::new();
        let sample = LogEntry::new(LogLevel::Info, "first").with_field("k", 1);
        formatter.format_header(true, Some(&sample));
        assert_eq!(formatter.current_headers(), vec!["k"]);

        formatter.reset_dynamic_mode();
        assert_eq!(formatter.current_headers().len(), 7);
    }
}
