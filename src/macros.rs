//! Construction macros for log entries.
//!
//! # Examples
//!
//! ```
//! use rust_blob_logger::{bulk_entry, log_entry, LogLevel};
//!
//! // Entry without metadata
//! let entry = log_entry!(LogLevel::Info, "Server started");
//!
//! // Metadata pairs keep the order they are written in
//! let entry = log_entry!(LogLevel::Warn, "Slow query", "table" => "orders", "ms" => 812);
//! assert_eq!(entry.metadata().unwrap().keys().next().unwrap(), "table");
//!
//! // Batch entry carrying its own timestamp
//! let bulk = bulk_entry!(at chrono::Utc::now(); LogLevel::Error, "Payment declined");
//! assert!(bulk.timestamp.is_some());
//! ```

/// Build a [`LogEntry`](crate::LogEntry) from a level, a message and
/// optional `key => value` metadata pairs.
#[macro_export]
macro_rules! log_entry {
    ($level:expr, $message:expr $(,)?) => {
        $crate::LogEntry::new($level, $message)
    };
    ($level:expr, $message:expr, $($key:expr => $value:expr),+ $(,)?) => {
        $crate::LogEntry::new($level, $message)$(.with_field($key, $value))+
    };
}

/// Build a [`BulkLogEntry`](crate::BulkLogEntry); prefix with `at <timestamp>;`
/// to pin the entry's time.
#[macro_export]
macro_rules! bulk_entry {
    (at $timestamp:expr; $($rest:tt)+) => {
        $crate::BulkLogEntry::new($crate::log_entry!($($rest)+)).with_timestamp($timestamp)
    };
    ($($rest:tt)+) => {
        $crate::BulkLogEntry::new($crate::log_entry!($($rest)+))
    };
}
