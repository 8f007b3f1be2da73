//! # Rust Blob Logger
//!
//! Writes structured log records straight into object storage as plain text,
//! CSV or XLSX blobs.
//!
//! ## Features
//!
//! - **Three Representations**: traditional lines, CSV with static or
//!   metadata-derived columns, and XLSX workbooks
//! - **Append-Optimized Writes**: tail appends capped at 4 MiB per call, with
//!   bulk payloads split into ordered chunks
//! - **Size-Based Rotation**: a full blob is replaced by a timestamped sibling
//! - **Strategy Cache**: one attached strategy per file and configuration
//!
//! ## Example
//!
//! ```
//! use rust_blob_logger::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryObjectStore::with_container("logs"));
//! let logger = BlobLogger::new(store, Arc::new(LocalGrantProvider::default()));
//!
//! let entry = log_entry!(LogLevel::Info, "Order created", "orderId" => "o-42");
//! logger.append_log("orders", &entry, None).await?;
//!
//! let content = logger.read_logs("orders", None).await?;
//! assert!(content.contains("[INFO]"));
//! # Ok::<(), LoggerError>(())
//! # }).unwrap();
//! ```

pub mod core;
pub mod formatters;
pub mod logger;
pub mod macros;
pub mod storage;
pub mod strategy;
pub mod writers;

/// Value of the `createdBy` metadata tag on blobs this crate creates
pub const CREATED_BY: &str = "rust_blob_logger";

pub mod prelude {
    pub use crate::core::{
        BulkLogEntry, FileType, LogEntry, LogFileConfig, LogLevel, LoggerError, LoggerMetrics,
        LoggingConfigOverrides, Result, ValidationReport,
    };
    pub use crate::logger::BlobLogger;
    pub use crate::storage::{AccessGrantProvider, LocalGrantProvider, MemoryObjectStore, ObjectStore};
    pub use crate::strategy::{FormatDescriptor, LogFileStats};
    pub use crate::{bulk_entry, log_entry};
}

pub use crate::core::{
    BulkLogEntry, FileType, LogEntry, LogFileConfig, LogLevel, LoggerError, LoggerMetrics,
    LoggingConfigOverrides, Metadata, Result, ValidationReport,
};
pub use formatters::{
    DelimitedFormatter, HeaderMode, LogFormatter, TabularFormatter, TraditionalFormatter,
};
pub use logger::{BlobLogger, StrategyCache};
pub use storage::{
    AccessGrant, AccessGrantProvider, BlobLocation, BlobPermission, LocalGrantProvider,
    MemoryObjectStore, ObjectStore, StorageError, MAX_APPEND_BLOCK_BYTES,
};
pub use strategy::{FormatDescriptor, LogFileStats, LogStrategy, StrategyFactory};
pub use writers::{AppendBlobWriter, LogWriter, SpreadsheetWriter, EMPTY_FILE_MESSAGE};
