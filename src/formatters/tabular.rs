//! Spreadsheet rows
//!
//! Never produces delimited text: each entry becomes one JSON object per line
//! whose keys are Title-Case column names. The spreadsheet writer turns the
//! stream of rows into the workbook.

use super::{cell_text, title_case, HeaderMode, LogFormatter};
use crate::core::{timestamp, FileType, LogEntry};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub const STATIC_HEADERS: [&str; 7] = [
    "Timestamp",
    "Level",
    "Request ID",
    "User ID",
    "Session ID",
    "Message",
    "Metadata",
];

#[derive(Debug, Clone, Default)]
pub struct TabularFormatter {
    mode: HeaderMode,
}

impl TabularFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row object for an entry, keyed by column name
    ///
    /// Numbers and booleans from metadata stay typed so the workbook stores
    /// them as numeric and boolean cells.
    pub fn row(&self, entry: &LogEntry, timestamp: DateTime<Utc>) -> Map<String, Value> {
        match (self.mode.dynamic_keys(), entry.metadata()) {
            (Some(keys), Some(metadata)) => keys
                .iter()
                .zip(column_names(keys))
                .map(|(key, column)| {
                    let value = metadata.get(key).map(cell);
                    (column, value.unwrap_or_else(|| Value::String(String::new())))
                })
                .collect(),
            _ => Self::static_row(entry, timestamp),
        }
    }

    fn static_row(entry: &LogEntry, timestamp: DateTime<Utc>) -> Map<String, Value> {
        let metadata = entry
            .metadata()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_default();

        let cells = [
            timestamp::iso8601(&timestamp),
            entry.level.to_str().to_string(),
            entry.request_id.clone().unwrap_or_default(),
            entry.user_id.clone().unwrap_or_default(),
            entry.session_id.clone().unwrap_or_default(),
            entry.message.clone(),
            metadata,
        ];

        STATIC_HEADERS
            .iter()
            .zip(cells)
            .map(|(header, cell)| (header.to_string(), Value::String(cell)))
            .collect()
    }
}

/// Title-Case column names for `keys`, suffixed ` 2`, ` 3`, ... where two
/// keys collapse to the same name (`user_id` and `userId`).
fn column_names(keys: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        let base = title_case(key);
        let mut column = base.clone();
        let mut n = 2;
        while columns.contains(&column) {
            column = format!("{} {}", base, n);
            n += 1;
        }
        columns.push(column);
    }
    columns
}

fn cell(value: &Value) -> Value {
    match value {
        Value::Number(_) | Value::Bool(_) | Value::String(_) => value.clone(),
        other => Value::String(cell_text(other)),
    }
}

impl LogFormatter for TabularFormatter {
    fn file_type(&self) -> FileType {
        FileType::Xlsx
    }

    fn format_entry(&self, entry: &LogEntry, timestamp: Option<DateTime<Utc>>) -> String {
        let row = self.row(entry, timestamp.unwrap_or_else(Utc::now));
        let mut line = serde_json::to_string(&row).unwrap_or_default();
        line.push('\n');
        line
    }

    /// The workbook header is structural, so this only updates the mode.
    fn format_header(&mut self, dynamic: bool, sample: Option<&LogEntry>) -> String {
        if dynamic {
            self.mode.activate(sample);
        }
        String::new()
    }

    fn current_headers(&self) -> Vec<String> {
        match self.mode.dynamic_keys() {
            Some(keys) => column_names(keys),
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
