//! Object storage seams
//!
//! The engine talks to two collaborators: an [`AccessGrantProvider`] that issues
//! short-lived, narrowly scoped grants, and an [`ObjectStore`] that performs
//! blob operations under such a grant. Every store call is authorised by the
//! grant it receives and targets the blob named in that grant.

pub mod credentials;
pub mod memory;

pub use credentials::LocalGrantProvider;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hard per-call payload ceiling of the append primitive (4 MiB)
pub const MAX_APPEND_BLOCK_BYTES: usize = 4 * 1024 * 1024;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("container '{container}' not found")]
    ContainerNotFound { container: String },

    #[error("blob '{path}' not found")]
    BlobNotFound { path: String },

    #[error("access denied: {message}")]
    AccessDenied { message: String },

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("blob '{path}' does not support this operation for its type")]
    BlobTypeMismatch { path: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Operation classes a grant can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobPermission {
    Read,
    Write,
    Create,
    /// Tail appends on an append blob
    Add,
}

impl BlobPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobPermission::Read => "read",
            BlobPermission::Write => "write",
            BlobPermission::Create => "create",
            BlobPermission::Add => "add",
        }
    }
}

/// Time-boxed grant for one blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub container: String,
    pub blob_path: String,
    pub access_url: String,
    pub token: String,
    pub permissions: Vec<BlobPermission>,
    pub expires_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn allows(&self, permission: BlobPermission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `container/blob_path`
    pub fn target(&self) -> String {
        format!("{}/{}", self.container, self.blob_path)
    }
}

/// Backend-reported state of a blob
#[derive(Debug, Clone, PartialEq)]
pub struct BlobProperties {
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Physical address of a log blob: `{container}/{directory}/{file_name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocation {
    pub container: String,
    pub directory: String,
    /// File name including its extension
    pub file_name: String,
}

impl BlobLocation {
    /// Build the location for `file_name` stored with `extension`.
    ///
    /// The extension is not appended again when `file_name` already ends with it.
    pub fn new(container: &str, directory: &str, file_name: &str, extension: &str) -> Self {
        let file_name = if file_name
            .to_ascii_lowercase()
            .ends_with(&extension.to_ascii_lowercase())
        {
            file_name.to_string()
        } else {
            format!("{}{}", file_name, extension)
        };

        Self {
            container: container.to_string(),
            directory: directory.trim_matches('/').to_string(),
            file_name,
        }
    }

    /// Path of the blob inside its container
    pub fn blob_path(&self) -> String {
        if self.directory.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.directory, self.file_name)
        }
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.blob_path())
    }
}

/// Credential service issuing scoped, time-limited grants
#[async_trait]
pub trait AccessGrantProvider: Send + Sync {
    async fn grant_access(
        &self,
        container: &str,
        blob_path: &str,
        permissions: &[BlobPermission],
        ttl_minutes: u32,
    ) -> StorageResult<AccessGrant>;
}

/// Object storage backend
///
/// Exposes the two write disciplines the writers rely on: a size-capped,
/// atomic-at-tail append primitive and a whole-object replace primitive.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the grant's container exists
    async fn container_exists(&self, grant: &AccessGrant) -> StorageResult<bool>;

    /// Size and metadata of the grant's blob, `None` if it does not exist
    async fn properties(&self, grant: &AccessGrant) -> StorageResult<Option<BlobProperties>>;

    /// Create an empty append blob
    async fn create_append_blob(
        &self,
        grant: &AccessGrant,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()>;

    /// Append `data` at the tail of an existing append blob.
    ///
    /// Payloads above [`MAX_APPEND_BLOCK_BYTES`] are rejected.
    async fn append_block(&self, grant: &AccessGrant, data: Bytes) -> StorageResult<()>;

    /// Create or overwrite the whole blob
    async fn upload(
        &self,
        grant: &AccessGrant,
        data: Bytes,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()>;

    /// Full blob content
    async fn download(&self, grant: &AccessGrant) -> StorageResult<Bytes>;
}
