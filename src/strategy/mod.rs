//! A formatter and a writer bound to one representation
//!
//! The strategy owns the per-file state: the formatter's header mode, the
//! header text frozen on first use, and the writer's blob target. Appends
//! check rotation first; a header is written in the same call as the first
//! row of an empty blob, including the fresh blob after a rotation.

pub mod factory;

pub use factory::{FormatDescriptor, StrategyFactory};

use crate::core::{BulkLogEntry, FileType, LogEntry, LogFileConfig, LoggerError, LoggerMetrics, Result};
use crate::formatters::LogFormatter;
use crate::storage::BlobLocation;
use crate::writers::{FileStats, LogWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stats of a logical log file as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileStats {
    pub exists: bool,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sizeMB")]
    pub size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl LogFileStats {
    pub fn new(stats: FileStats, file_type: FileType) -> Self {
        Self {
            exists: stats.exists,
            file_type,
            size_bytes: stats.size_bytes,
            size_mb: stats.size_mb,
            last_modified: stats.last_modified,
            created_at: stats.created_at,
        }
    }
}

pub struct LogStrategy {
    file_name: String,
    file_type: FileType,
    config: LogFileConfig,
    formatter: Box<dyn LogFormatter>,
    writer: Box<dyn LogWriter>,
    metrics: Arc<LoggerMetrics>,
    header: Option<String>,
}

impl LogStrategy {
    pub fn new(
        file_name: impl Into<String>,
        config: LogFileConfig,
        formatter: Box<dyn LogFormatter>,
        writer: Box<dyn LogWriter>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: formatter.file_type(),
            config,
            formatter,
            writer,
            metrics,
            header: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn config(&self) -> &LogFileConfig {
        &self.config
    }

    /// Blob currently written to, which changes on rotation
    pub fn location(&self) -> Option<&BlobLocation> {
        self.writer.location()
    }

    pub fn current_headers(&self) -> Vec<String> {
        self.formatter.current_headers()
    }

    /// Bind the writer to the blob without creating it.
    ///
    /// Returns whether the blob already exists.
    pub async fn attach(&mut self) -> Result<bool> {
        self.writer.attach(&self.file_name, &self.config).await
    }

    /// Bind the writer and create the blob if needed
    pub async fn initialize(&mut self) -> Result<()> {
        self.writer.initialize(&self.file_name, &self.config).await
    }

    pub async fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if !self.formatter.validate_entry(entry) {
            return Err(LoggerError::validation(
                "log entry requires a level and a non-empty message",
            ));
        }

        self.prepare_write().await?;
        let header = self.header(Some(entry));
        let line = self.formatter.format_entry(entry, None);
        let content = self.with_header(header, line);

        self.writer.write_entry(&content).await?;
        self.metrics.record_entries(1);
        Ok(())
    }

    /// Append a batch as one payload.
    ///
    /// Every entry is validated before anything is written; an empty batch is
    /// a no-op.
    pub async fn append_bulk(&mut self, entries: &[BulkLogEntry]) -> Result<()> {
        if let Some(idx) = entries
            .iter()
            .position(|bulk| !self.formatter.validate_entry(&bulk.entry))
        {
            return Err(LoggerError::validation(format!(
                "entry {} of {} requires a level and a non-empty message",
                idx,
                entries.len()
            )));
        }
        if entries.is_empty() {
            return Ok(());
        }

        self.prepare_write().await?;
        let header = self.header(entries.first().map(|bulk| &bulk.entry));
        let body = self.formatter.format_bulk_entries(entries);
        let content = self.with_header(header, body);

        self.writer.write_bulk(&content).await?;
        self.metrics.record_entries(entries.len() as u64);
        Ok(())
    }

    pub async fn read(&mut self) -> Result<String> {
        self.writer.read_content().await
    }

    pub async fn stats(&mut self) -> LogFileStats {
        LogFileStats::new(self.writer.stats().await, self.file_type)
    }

    /// Make sure the blob exists, then rotate if it reached the threshold
    async fn prepare_write(&mut self) -> Result<()> {
        self.writer.ensure_exists().await?;
        if self.writer.needs_rotation().await {
            let new_name = self.writer.rotate().await?;
            tracing::debug!(file = %self.file_name, rotated_to = %new_name, "strategy switched blob");
        }
        Ok(())
    }

    /// Header text, computed once per strategy from the first entry written
    fn header(&mut self, sample: Option<&LogEntry>) -> String {
        if let Some(header) = &self.header {
            return header.clone();
        }
        let header = self
            .formatter
            .format_header(self.config.dynamic_columns, sample);
        self.header = Some(header.clone());
        header
    }

    fn with_header(&self, header: String, body: String) -> String {
        if self.writer.is_empty() && !header.is_empty() {
            header + &body
        } else {
            body
        }
    }
}
