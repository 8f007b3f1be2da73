//! Append-optimized writer
//!
//! Built on the backend's append primitive: writes land atomically at the tail
//! of the blob, each call carrying at most [`MAX_APPEND_BLOCK_BYTES`]. Single
//! entries above the ceiling are rejected; bulk payloads are cut into ordered
//! chunks at arbitrary byte offsets.

use super::{content_or_sentinel, BlobTarget, FileStats, LogWriter, WriterContext};
use crate::core::{FileType, LogFileConfig, LoggerError, Result};
use crate::storage::{BlobLocation, BlobPermission, MAX_APPEND_BLOCK_BYTES};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

const PERMISSIONS: [BlobPermission; 4] = [
    BlobPermission::Read,
    BlobPermission::Write,
    BlobPermission::Create,
    BlobPermission::Add,
];

/// Writer for the LOG and CSV representations
///
/// Holds no content in memory. Each write becomes one or more append calls
/// against the blob the writer was attached to, and rotation re-targets the
/// writer at a fresh sibling blob.
pub struct AppendBlobWriter {
    ctx: WriterContext,
    file_type: FileType,
    target: Option<BlobTarget>,
}

impl AppendBlobWriter {
    /// Unattached writer producing blobs of `file_type`.
    ///
    /// Call [`LogWriter::attach`] or [`LogWriter::initialize`] before writing.
    pub fn new(ctx: WriterContext, file_type: FileType) -> Self {
        Self {
            ctx,
            file_type,
            target: None,
        }
    }

    fn target_mut(&mut self) -> Result<&mut BlobTarget> {
        self.target
            .as_mut()
            .ok_or_else(|| LoggerError::config("AppendBlobWriter", "writer not initialized"))
    }

    async fn open(&mut self, logical_name: &str, file_name: &str, config: &LogFileConfig) -> Result<bool> {
        let (target, _) = BlobTarget::open(
            &self.ctx,
            logical_name,
            file_name,
            config,
            self.file_type,
            &PERMISSIONS,
        )
        .await?;
        let exists = target.exists;
        self.target = Some(target);
        Ok(exists)
    }

    /// One append call, counted in the write metrics
    async fn append(&mut self, payload: Bytes) -> Result<()> {
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        let len = payload.len();
        let grant = target.fresh_grant(&ctx).await?.clone();

        ctx.store.append_block(&grant, payload).await?;
        target.size_bytes += len as u64;
        ctx.metrics.record_write_call(len as u64);
        Ok(())
    }
}

#[async_trait]
impl LogWriter for AppendBlobWriter {
    fn name(&self) -> &str {
        "append_blob"
    }

    async fn attach(&mut self, file_name: &str, config: &LogFileConfig) -> Result<bool> {
        self.open(file_name, file_name, config).await
    }

    async fn ensure_exists(&mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        if target.exists {
            return Ok(());
        }
        // Attached for reading earlier; someone may have created it since
        if target.probe(&ctx).await?.is_some() {
            return Ok(());
        }

        let metadata = target.creation_metadata();
        let grant = target.fresh_grant(&ctx).await?.clone();
        ctx.store
            .create_append_blob(&grant, target.file_type.content_type(), metadata)
            .await?;
        target.exists = true;
        target.size_bytes = 0;

        tracing::info!(
            container = %target.location.container,
            path = %target.location.blob_path(),
            "created append blob"
        );
        Ok(())
    }

    /// Append a single formatted entry.
    ///
    /// Content over [`MAX_APPEND_BLOCK_BYTES`] fails with
    /// [`LoggerError::EntryTooLarge`] before any backend call.
    async fn write_entry(&mut self, content: &str) -> Result<()> {
        if content.len() > MAX_APPEND_BLOCK_BYTES {
            return Err(LoggerError::entry_too_large(
                content.len(),
                MAX_APPEND_BLOCK_BYTES,
            ));
        }
        self.append(Bytes::copy_from_slice(content.as_bytes())).await
    }

    /// Append a bulk payload as ordered chunks of at most
    /// [`MAX_APPEND_BLOCK_BYTES`]; chunk boundaries ignore line breaks.
    async fn write_bulk(&mut self, content: &str) -> Result<()> {
        let payload = Bytes::copy_from_slice(content.as_bytes());
        let chunks = payload.len().div_ceil(MAX_APPEND_BLOCK_BYTES);
        if chunks > 1 {
            tracing::debug!(bytes = payload.len(), chunks, "splitting bulk payload");
        }

        let mut offset = 0;
        while offset < payload.len() {
            let end = (offset + MAX_APPEND_BLOCK_BYTES).min(payload.len());
            self.append(payload.slice(offset..end)).await?;
            offset = end;
        }
        Ok(())
    }

    async fn needs_rotation(&mut self) -> bool {
        let ctx = self.ctx.clone();
        let Some(target) = self.target.as_mut() else {
            return false;
        };
        match target.probe(&ctx).await {
            Ok(Some(props)) => props.size_bytes >= target.max_bytes(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(path = %target.location, error = %e, "size probe failed, skipping rotation check");
                false
            }
        }
    }

    async fn rotate(&mut self) -> Result<String> {
        let target = self.target_mut()?;
        let logical_name = target.logical_name.clone();
        let config = target.config.clone();
        let previous = target.location.to_string();
        let new_name = target.rotated_file_name(Utc::now());

        self.open(&logical_name, &new_name, &config).await?;
        self.ensure_exists().await?;
        self.ctx.metrics.record_rotation();

        tracing::info!(from = %previous, to = %new_name, "rotated log blob");
        Ok(new_name)
    }

    /// Current blob properties; a missing blob or a failed lookup both
    /// report `exists: false`.
    async fn stats(&mut self) -> FileStats {
        let ctx = self.ctx.clone();
        let Some(target) = self.target.as_mut() else {
            return FileStats::missing();
        };
        match target.probe(&ctx).await {
            Ok(Some(props)) => FileStats::from_properties(&props),
            _ => FileStats::missing(),
        }
    }

    async fn read_content(&mut self) -> Result<String> {
        let ctx = self.ctx.clone();
        let target = self.target_mut()?;
        if target.probe(&ctx).await?.is_none() {
            return Err(LoggerError::not_found(target.location.to_string()));
        }

        let data = ctx.store.download(&target.grant).await?;
        Ok(content_or_sentinel(String::from_utf8_lossy(&data).into_owned()))
    }

    fn is_empty(&self) -> bool {
        self.target.as_ref().map_or(true, |t| t.size_bytes == 0)
    }

    fn location(&self) -> Option<&BlobLocation> {
        self.target.as_ref().map(|t| &t.location)
    }
}
