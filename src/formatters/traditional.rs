//! Traditional text lines
//!
//! `[timestamp] [LEVEL] [requestId] [User:userId] [Session:sessionId] message | Metadata: {json}`
//!
//! Absent bracketed fields are omitted, not blanked, and the metadata suffix only
//! appears when there is metadata.

use super::{HeaderMode, LogFormatter};
use crate::core::{timestamp, FileType, LogEntry};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct TraditionalFormatter {
    mode: HeaderMode,
}

impl TraditionalFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escape line breaks and tabs so one entry always stays on one line
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }
}

impl LogFormatter for TraditionalFormatter {
    fn file_type(&self) -> FileType {
        FileType::Log
    }

    fn format_entry(&self, entry: &LogEntry, timestamp: Option<DateTime<Utc>>) -> String {
        let timestamp = timestamp.unwrap_or_else(Utc::now);
        let mut line = format!(
            "[{}] [{}]",
            timestamp::iso8601(&timestamp),
            entry.level.to_str()
        );

        if let Some(ref request_id) = entry.request_id {
            line.push_str(&format!(" [{}]", request_id));
        }
        if let Some(ref user_id) = entry.user_id {
            line.push_str(&format!(" [User:{}]", user_id));
        }
        if let Some(ref session_id) = entry.session_id {
            line.push_str(&format!(" [Session:{}]", session_id));
        }

        line.push(' ');
        line.push_str(&Self::sanitize_message(&entry.message));

        if let Some(metadata) = entry.metadata() {
            let json = serde_json::to_string(metadata).unwrap_or_default();
            line.push_str(" | Metadata: ");
            line.push_str(&json);
        }

        line.push('\n');
        line
    }

    /// Plain text has no header; the mode is still tracked so callers can
    /// treat all formatters alike.
    fn format_header(&mut self, dynamic: bool, sample: Option<&LogEntry>) -> String {
        if dynamic {
            self.mode.activate(sample);
        }
        String::new()
    }

    fn current_headers(&self) -> Vec<String> {
        self.mode.dynamic_keys().map(<[String]>::to_vec).unwrap_or_default()
    }

    fn reset_dynamic_mode(&mut self) {
        self.mode = HeaderMode::Static;
    }

    fn is_dynamic(&self) -> bool {
        self.mode.is_dynamic()
    }
}
