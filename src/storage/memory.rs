//! In-memory object store for local development and tests
//!
//! Mirrors the backend rules the writers depend on: append blobs only accept
//! tail appends up to [`MAX_APPEND_BLOCK_BYTES`], block blobs are replaced as a
//! whole, and every call must carry an unexpired grant with the right permission.

use super::{
    AccessGrant, BlobPermission, BlobProperties, ObjectStore, StorageError, StorageResult,
    MAX_APPEND_BLOCK_BYTES,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobKind {
    Append,
    Block,
}

#[derive(Debug, Clone)]
struct MemoryBlob {
    kind: BlobKind,
    data: BytesMut,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    containers: HashSet<String>,
    blobs: HashMap<(String, String), MemoryBlob>,
    /// (container/path, payload length) for every accepted append
    appends: Vec<(String, usize)>,
    uploads: Vec<String>,
}

/// In-memory object store.
#[derive(Clone, Debug, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<State>>,
    fail_probes: Arc<AtomicBool>,
    offline: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    /// Creates a store with no containers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `container`.
    #[must_use]
    pub fn with_container(container: impl Into<String>) -> Self {
        let store = Self::new();
        store.create_container(container);
        store
    }

    pub fn create_container(&self, container: impl Into<String>) {
        self.state.lock().containers.insert(container.into());
    }

    /// Make every `properties` call fail with a transport error
    pub fn set_probe_failure(&self, fail: bool) {
        self.fail_probes.store(fail, Ordering::Relaxed);
    }

    /// Make every call fail with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Raw content of a blob
    pub fn blob_content(&self, container: &str, path: &str) -> Option<Bytes> {
        self.state
            .lock()
            .blobs
            .get(&(container.to_string(), path.to_string()))
            .map(|blob| blob.data.clone().freeze())
    }

    /// Creation metadata attached to a blob
    pub fn blob_metadata(&self, container: &str, path: &str) -> Option<HashMap<String, String>> {
        self.state
            .lock()
            .blobs
            .get(&(container.to_string(), path.to_string()))
            .map(|blob| blob.metadata.clone())
    }

    /// Sorted blob paths inside `container`
    pub fn blob_paths(&self, container: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .state
            .lock()
            .blobs
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Payload lengths of every accepted append against `container/path`, in order
    pub fn append_sizes(&self, container: &str, path: &str) -> Vec<usize> {
        let target = format!("{}/{}", container, path);
        self.state
            .lock()
            .appends
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, len)| *len)
            .collect()
    }

    /// Number of whole-object uploads against `container/path`
    pub fn upload_count(&self, container: &str, path: &str) -> usize {
        let target = format!("{}/{}", container, path);
        self.state
            .lock()
            .uploads
            .iter()
            .filter(|t| **t == target)
            .count()
    }

    /// Place a block blob directly, bypassing grants
    pub fn put_blob(&self, container: &str, path: &str, data: impl Into<Bytes>) {
        let now = Utc::now();
        let data: Bytes = data.into();
        self.state.lock().blobs.insert(
            (container.to_string(), path.to_string()),
            MemoryBlob {
                kind: BlobKind::Block,
                data: BytesMut::from(&data[..]),
                content_type: None,
                metadata: HashMap::new(),
                created_at: now,
                last_modified: now,
            },
        );
    }

    pub fn delete_blob(&self, container: &str, path: &str) -> bool {
        self.state
            .lock()
            .blobs
            .remove(&(container.to_string(), path.to_string()))
            .is_some()
    }

    fn authorize(&self, grant: &AccessGrant, permission: BlobPermission) -> StorageResult<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StorageError::Transport("backend unreachable".to_string()));
        }
        if grant.is_expired(Utc::now()) {
            return Err(StorageError::AccessDenied {
                message: format!("grant for {} has expired", grant.target()),
            });
        }
        if !grant.allows(permission) {
            return Err(StorageError::AccessDenied {
                message: format!(
                    "grant for {} lacks '{}' permission",
                    grant.target(),
                    permission.as_str()
                ),
            });
        }
        Ok(())
    }

    fn require_container(state: &State, grant: &AccessGrant) -> StorageResult<()> {
        if state.containers.contains(&grant.container) {
            Ok(())
        } else {
            Err(StorageError::ContainerNotFound {
                container: grant.container.clone(),
            })
        }
    }

    fn key(grant: &AccessGrant) -> (String, String) {
        (grant.container.clone(), grant.blob_path.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn container_exists(&self, grant: &AccessGrant) -> StorageResult<bool> {
        self.authorize(grant, BlobPermission::Read)?;
        Ok(self.state.lock().containers.contains(&grant.container))
    }

    async fn properties(&self, grant: &AccessGrant) -> StorageResult<Option<BlobProperties>> {
        self.authorize(grant, BlobPermission::Read)?;
        if self.fail_probes.load(Ordering::Relaxed) {
            return Err(StorageError::Transport("property probe failed".to_string()));
        }

        let state = self.state.lock();
        Self::require_container(&state, grant)?;
        Ok(state.blobs.get(&Self::key(grant)).map(|blob| BlobProperties {
            size_bytes: blob.data.len() as u64,
            created_at: blob.created_at,
            last_modified: blob.last_modified,
            content_type: blob.content_type.clone(),
            metadata: blob.metadata.clone(),
        }))
    }

    async fn create_append_blob(
        &self,
        grant: &AccessGrant,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        self.authorize(grant, BlobPermission::Create)?;

        let mut state = self.state.lock();
        Self::require_container(&state, grant)?;
        let now = Utc::now();
        state.blobs.insert(
            Self::key(grant),
            MemoryBlob {
                kind: BlobKind::Append,
                data: BytesMut::new(),
                content_type: Some(content_type.to_string()),
                metadata,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(())
    }

    async fn append_block(&self, grant: &AccessGrant, data: Bytes) -> StorageResult<()> {
        self.authorize(grant, BlobPermission::Add)?;
        if data.len() > MAX_APPEND_BLOCK_BYTES {
            return Err(StorageError::PayloadTooLarge {
                size: data.len(),
                limit: MAX_APPEND_BLOCK_BYTES,
            });
        }

        let mut state = self.state.lock();
        Self::require_container(&state, grant)?;
        let blob = state
            .blobs
            .get_mut(&Self::key(grant))
            .ok_or_else(|| StorageError::BlobNotFound {
                path: grant.target(),
            })?;
        if blob.kind != BlobKind::Append {
            return Err(StorageError::BlobTypeMismatch {
                path: grant.target(),
            });
        }
        blob.data.extend_from_slice(&data);
        blob.last_modified = Utc::now();
        state.appends.push((grant.target(), data.len()));
        Ok(())
    }

    async fn upload(
        &self,
        grant: &AccessGrant,
        data: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        self.authorize(grant, BlobPermission::Write)?;

        let mut state = self.state.lock();
        Self::require_container(&state, grant)?;
        let now = Utc::now();
        let created_at = state
            .blobs
            .get(&Self::key(grant))
            .map_or(now, |existing| existing.created_at);
        state.blobs.insert(
            Self::key(grant),
            MemoryBlob {
                kind: BlobKind::Block,
                data: BytesMut::from(&data[..]),
                content_type: Some(content_type.to_string()),
                metadata,
                created_at,
                last_modified: now,
            },
        );
        state.uploads.push(grant.target());
        Ok(())
    }

    async fn download(&self, grant: &AccessGrant) -> StorageResult<Bytes> {
        self.authorize(grant, BlobPermission::Read)?;

        let state = self.state.lock();
        Self::require_container(&state, grant)?;
        state
            .blobs
            .get(&Self::key(grant))
            .map(|blob| blob.data.clone().freeze())
            .ok_or_else(|| StorageError::BlobNotFound {
                path: grant.target(),
            })
    }
}
