//! Writers owning the physical blob lifecycle
//!
//! - [`AppendBlobWriter`]: tail appends, chunked for bulk payloads
//! - [`SpreadsheetWriter`]: keeps every row in memory and re-uploads the
//!   whole workbook on each write

pub mod append_blob;
pub mod spreadsheet;

pub use append_blob::AppendBlobWriter;
pub use spreadsheet::SpreadsheetWriter;

use crate::core::{timestamp, FileType, LogFileConfig, LoggerError, LoggerMetrics, Result};
use crate::storage::{
    AccessGrant, AccessGrantProvider, BlobLocation, BlobPermission, BlobProperties, ObjectStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifetime requested for every access grant
pub const GRANT_TTL_MINUTES: u32 = 60;

/// Returned by `read_content` when the blob exists but holds nothing
pub const EMPTY_FILE_MESSAGE: &str = "Log file exists but is empty";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Collaborators shared by every writer
#[derive(Clone)]
pub struct WriterContext {
    pub store: Arc<dyn ObjectStore>,
    pub grants: Arc<dyn AccessGrantProvider>,
    pub metrics: Arc<LoggerMetrics>,
}

impl WriterContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        grants: Arc<dyn AccessGrantProvider>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            store,
            grants,
            metrics,
        }
    }
}

/// Backend view of a log blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sizeMB")]
    pub size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FileStats {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn from_properties(props: &BlobProperties) -> Self {
        let size_mb = (props.size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0;
        Self {
            exists: true,
            size_bytes: Some(props.size_bytes),
            size_mb: Some(size_mb),
            last_modified: Some(props.last_modified),
            created_at: Some(props.created_at),
        }
    }
}

/// Writer half of a strategy
#[async_trait]
pub trait LogWriter: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire a grant for `file_name`, verify the container and probe the blob
    /// without creating it. Returns whether the blob exists.
    async fn attach(&mut self, file_name: &str, config: &LogFileConfig) -> Result<bool>;

    /// Create the blob if the last probe found it missing
    async fn ensure_exists(&mut self) -> Result<()>;

    /// Attach and make sure the blob exists
    async fn initialize(&mut self, file_name: &str, config: &LogFileConfig) -> Result<()> {
        self.attach(file_name, config).await?;
        self.ensure_exists().await
    }

    /// Write one formatted unit
    async fn write_entry(&mut self, content: &str) -> Result<()>;

    /// Write a pre-concatenated multi-entry payload
    async fn write_bulk(&mut self, content: &str) -> Result<()>;

    /// Whether the backend-reported size reached the configured threshold.
    ///
    /// A failed size probe answers `false`.
    async fn needs_rotation(&mut self) -> bool;

    /// Switch to a freshly named sibling blob and return its file name
    async fn rotate(&mut self) -> Result<String>;

    async fn stats(&mut self) -> FileStats;

    async fn read_content(&mut self) -> Result<String>;

    /// Whether the current blob held no bytes as of the last write or probe
    fn is_empty(&self) -> bool;

    fn location(&self) -> Option<&BlobLocation>;
}

/// The blob a writer is currently bound to
#[derive(Debug, Clone)]
pub(crate) struct BlobTarget {
    /// File name the strategy was built for, before any rotation
    pub logical_name: String,
    pub config: LogFileConfig,
    pub file_type: FileType,
    pub location: BlobLocation,
    pub grant: AccessGrant,
    pub permissions: Vec<BlobPermission>,
    pub exists: bool,
    pub size_bytes: u64,
}

impl BlobTarget {
    /// Acquire a grant for the blob and probe it
    pub async fn open(
        ctx: &WriterContext,
        logical_name: &str,
        file_name: &str,
        config: &LogFileConfig,
        file_type: FileType,
        permissions: &[BlobPermission],
    ) -> Result<(Self, Option<BlobProperties>)> {
        let location = BlobLocation::new(
            &config.container_name,
            &config.directory,
            file_name,
            file_type.extension(),
        );

        let grant = ctx
            .grants
            .grant_access(
                &location.container,
                &location.blob_path(),
                permissions,
                GRANT_TTL_MINUTES,
            )
            .await?;

        if !ctx.store.container_exists(&grant).await? {
            return Err(LoggerError::container_missing(&location.container));
        }

        let props = ctx.store.properties(&grant).await?;
        let target = Self {
            logical_name: logical_name.to_string(),
            config: config.clone(),
            file_type,
            location,
            grant,
            permissions: permissions.to_vec(),
            exists: props.is_some(),
            size_bytes: props.as_ref().map_or(0, |p| p.size_bytes),
        };
        Ok((target, props))
    }

    /// Re-request the grant when it is about to expire
    pub async fn fresh_grant(&mut self, ctx: &WriterContext) -> Result<&AccessGrant> {
        if self.grant.is_expired(Utc::now() + Duration::minutes(1)) {
            self.grant = ctx
                .grants
                .grant_access(
                    &self.location.container,
                    &self.location.blob_path(),
                    &self.permissions,
                    GRANT_TTL_MINUTES,
                )
                .await?;
        }
        Ok(&self.grant)
    }

    /// Probe the blob, updating the cached existence and size
    pub async fn probe(&mut self, ctx: &WriterContext) -> Result<Option<BlobProperties>> {
        self.fresh_grant(ctx).await?;
        let props = ctx.store.properties(&self.grant).await?;
        self.exists = props.is_some();
        self.size_bytes = props.as_ref().map_or(0, |p| p.size_bytes);
        Ok(props)
    }

    pub fn max_bytes(&self) -> u64 {
        self.config.max_file_size_bytes()
    }

    /// `{base}-rotated-{timestamp}{extension}`, always derived from the logical name
    pub fn rotated_file_name(&self, now: DateTime<Utc>) -> String {
        let extension = self.file_type.extension();
        let base = strip_extension(&self.logical_name, extension);
        format!(
            "{}-rotated-{}{}",
            base,
            timestamp::file_name_suffix(&now),
            extension
        )
    }

    /// Metadata tagged onto a blob when the writer creates it
    pub fn creation_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("createdBy".to_string(), crate::CREATED_BY.to_string()),
            ("createdAt".to_string(), timestamp::iso8601(&Utc::now())),
            ("fileType".to_string(), self.file_type.as_str().to_string()),
            ("logicalName".to_string(), self.logical_name.clone()),
        ])
    }
}

fn strip_extension<'a>(file_name: &'a str, extension: &str) -> &'a str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(&extension.to_ascii_lowercase()) && file_name.len() >= extension.len() {
        &file_name[..file_name.len() - extension.len()]
    } else {
        file_name
    }
}

/// Text returned for blob content, with the empty-file sentinel applied
pub(crate) fn content_or_sentinel(text: String) -> String {
    if text.trim().is_empty() {
        EMPTY_FILE_MESSAGE.to_string()
    } else {
        text
    }
}
