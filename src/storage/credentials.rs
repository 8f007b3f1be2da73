//! In-process credential service for local development and tests

use super::{AccessGrant, AccessGrantProvider, BlobPermission, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Issues grants with random tokens without contacting any identity service.
#[derive(Debug)]
pub struct LocalGrantProvider {
    base_url: String,
    issued: AtomicU64,
    deny: AtomicBool,
}

impl Default for LocalGrantProvider {
    fn default() -> Self {
        Self::new("memory://local")
    }
}

impl LocalGrantProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            issued: AtomicU64::new(0),
            deny: AtomicBool::new(false),
        }
    }

    /// Number of grants handed out so far
    pub fn issued_count(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Refuse every subsequent request
    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::Relaxed);
    }
}

#[async_trait]
impl AccessGrantProvider for LocalGrantProvider {
    async fn grant_access(
        &self,
        container: &str,
        blob_path: &str,
        permissions: &[BlobPermission],
        ttl_minutes: u32,
    ) -> StorageResult<AccessGrant> {
        if self.deny.load(Ordering::Relaxed) {
            return Err(StorageError::AccessDenied {
                message: format!("grant refused for {}/{}", container, blob_path),
            });
        }
        if permissions.is_empty() {
            return Err(StorageError::AccessDenied {
                message: "a grant needs at least one permission".to_string(),
            });
        }

        self.issued.fetch_add(1, Ordering::Relaxed);
        let token = uuid::Uuid::new_v4().to_string();
        Ok(AccessGrant {
            container: container.to_string(),
            blob_path: blob_path.to_string(),
            access_url: format!("{}/{}/{}?token={}", self.base_url, container, blob_path, token),
            token,
            permissions: permissions.to_vec(),
            expires_at: Utc::now() + Duration::minutes(i64::from(ttl_minutes)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_is_scoped_and_time_boxed() {
        let provider = LocalGrantProvider::default();
        let grant = provider
            .grant_access("logs", "app/a.log", &[BlobPermission::Read], 60)
            .await
            .unwrap();

        assert_eq!(grant.target(), "logs/app/a.log");
        assert!(grant.allows(BlobPermission::Read));
        assert!(!grant.allows(BlobPermission::Write));
        assert!(!grant.is_expired(Utc::now()));
        assert!(grant.is_expired(Utc::now() + Duration::minutes(61)));
        assert!(grant.access_url.contains(&grant.token));
        assert_eq!(provider.issued_count(), 1);
    }

    #[tokio::test]
    async fn test_denied_provider() {
        let provider = LocalGrantProvider::default();
        provider.set_deny(true);
        let err = provider
            .grant_access("logs", "a.log", &[BlobPermission::Read], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AccessDenied { .. }));
        assert_eq!(provider.issued_count(), 0);
    }
}
