//! Core types shared by formatters, writers and the facade

pub mod config;
pub mod error;
pub mod file_type;
pub mod log_entry;
pub mod log_level;
pub mod metrics;
pub mod timestamp;

pub use config::{
    LogFileConfig, LoggingConfigOverrides, ValidationReport, DEFAULT_CONTAINER,
    DEFAULT_DIRECTORY, DEFAULT_MAX_FILE_SIZE_MB,
};
pub use error::{LoggerError, Result};
pub use file_type::FileType;
pub use log_entry::{BulkLogEntry, LogEntry, Metadata};
pub use log_level::LogLevel;
pub use metrics::LoggerMetrics;
