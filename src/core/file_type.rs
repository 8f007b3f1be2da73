//! Output representations a logical log file can be persisted as

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted representation of a log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text, one line per entry
    #[default]
    Log,
    /// Comma separated values with a header row
    Csv,
    /// Spreadsheet workbook, regenerated on every write
    Xlsx,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Log, FileType::Csv, FileType::Xlsx];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Log => "log",
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
        }
    }

    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Log => ".log",
            FileType::Csv => ".csv",
            FileType::Xlsx => ".xlsx",
        }
    }

    /// Whether the representation can be extended by tail appends
    pub fn supports_append(&self) -> bool {
        !matches!(self, FileType::Xlsx)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileType::Log => "text/plain; charset=utf-8",
            FileType::Csv => "text/csv; charset=utf-8",
            FileType::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FileType::Log => "Traditional text log, one line per entry with bracketed fields",
            FileType::Csv => "Comma separated values with a static or metadata-derived header",
            FileType::Xlsx => "Excel workbook, fully regenerated on each write",
        }
    }

    /// Infer the representation from a file name's extension.
    ///
    /// Anything other than `.csv` or `.xlsx` falls back to [`FileType::Log`].
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            FileType::Csv
        } else if lower.ends_with(".xlsx") {
            FileType::Xlsx
        } else {
            FileType::Log
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(FileType::Log),
            "csv" => Ok(FileType::Csv),
            "xlsx" => Ok(FileType::Xlsx),
            _ => Err(format!("Unsupported file type: '{}'", s)),
        }
    }
}
