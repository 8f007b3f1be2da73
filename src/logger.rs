//! Logging facade
//!
//! [`BlobLogger`] is the only type callers address. It keeps one attached
//! [`LogStrategy`] per `(file name, configuration)` so repeated calls skip the
//! grant request and existence probe, and it prefixes every failure with the
//! operation that was attempted.

use crate::core::config::{check_container_name, check_directory, check_max_file_size};
use crate::core::{
    BulkLogEntry, LogEntry, LogFileConfig, LoggerError, LoggerMetrics, LoggingConfigOverrides,
    Result, ValidationReport,
};
use crate::storage::{AccessGrantProvider, ObjectStore};
use crate::strategy::{FormatDescriptor, LogFileStats, LogStrategy, StrategyFactory};
use crate::writers::WriterContext;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

/// A cached strategy; the async lock serializes operations on one file
pub type SharedStrategy = Arc<AsyncMutex<LogStrategy>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    file_name: String,
    config: LogFileConfig,
}

/// Attached strategies keyed by file name and configuration value
///
/// Each key owns a once-cell, so concurrent first calls for the same file
/// build and attach a single strategy while the others wait for it.
#[derive(Default)]
pub struct StrategyCache {
    slots: Mutex<HashMap<CacheKey, Arc<OnceCell<SharedStrategy>>>>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached strategy, building and attaching it on first use.
    ///
    /// A failed build leaves the key empty so the next call retries.
    pub async fn get_or_build(
        &self,
        file_name: &str,
        config: &LogFileConfig,
        ctx: &WriterContext,
    ) -> Result<SharedStrategy> {
        let key = CacheKey {
            file_name: file_name.to_string(),
            config: config.clone(),
        };
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();

        if let Some(strategy) = slot.get() {
            ctx.metrics.record_cache_hit();
            tracing::debug!(file = file_name, "strategy cache hit");
            return Ok(strategy.clone());
        }

        match slot.get_or_try_init(|| Self::build(file_name, config, ctx)).await {
            Ok(strategy) => Ok(strategy.clone()),
            Err(e) => {
                self.evict_empty(&key, &slot);
                Err(e)
            }
        }
    }

    /// Remove `slot` if it is still the entry for `key` and never filled.
    ///
    /// A waiter that retries and succeeds fills the same slot, and a clear may
    /// have replaced it, so both cases leave the map alone.
    fn evict_empty(&self, key: &CacheKey, slot: &Arc<OnceCell<SharedStrategy>>) {
        let mut slots = self.slots.lock();
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(key);
        }
    }

    async fn build(file_name: &str, config: &LogFileConfig, ctx: &WriterContext) -> Result<SharedStrategy> {
        let mut strategy = StrategyFactory::create_strategy(file_name, config, ctx);
        strategy.attach().await?;
        Ok(Arc::new(AsyncMutex::new(strategy)))
    }

    /// Number of attached strategies
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; in-flight operations keep their strategy until done
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock();
        let dropped = slots.values().filter(|slot| slot.initialized()).count();
        slots.clear();
        dropped
    }
}

pub struct BlobLogger {
    ctx: WriterContext,
    cache: StrategyCache,
}

impl BlobLogger {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, grants: Arc<dyn AccessGrantProvider>) -> Self {
        Self::with_metrics(store, grants, Arc::new(LoggerMetrics::new()))
    }

    #[must_use]
    pub fn with_metrics(
        store: Arc<dyn ObjectStore>,
        grants: Arc<dyn AccessGrantProvider>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            ctx: WriterContext::new(store, grants, metrics),
            cache: StrategyCache::new(),
        }
    }

    pub fn metrics(&self) -> &Arc<LoggerMetrics> {
        &self.ctx.metrics
    }

    pub fn cached_strategies(&self) -> usize {
        self.cache.len()
    }

    /// Append one entry to `file_name`, creating the blob on first write.
    ///
    /// # Errors
    ///
    /// Fails with a "Failed to append log" [`LoggerError::Operation`] wrapping
    /// the cause; use [`LoggerError::root`] to match on it.
    pub async fn append_log(
        &self,
        file_name: &str,
        entry: &LogEntry,
        config: Option<&LogFileConfig>,
    ) -> Result<()> {
        self.run("append log", async {
            let strategy = self.strategy(file_name, config).await?;
            let mut strategy = strategy.lock().await;
            strategy.append(entry).await
        })
        .await
    }

    /// Append a batch in input order as a single payload.
    ///
    /// Every entry is validated first; one invalid entry rejects the batch.
    pub async fn append_bulk_logs(
        &self,
        file_name: &str,
        entries: &[BulkLogEntry],
        config: Option<&LogFileConfig>,
    ) -> Result<()> {
        self.run("append bulk logs", async {
            let strategy = self.strategy(file_name, config).await?;
            let mut strategy = strategy.lock().await;
            strategy.append_bulk(entries).await
        })
        .await
    }

    /// Full content of the current blob of `file_name`.
    ///
    /// Spreadsheets come back as delimited text. An existing but empty blob
    /// yields [`EMPTY_FILE_MESSAGE`](crate::writers::EMPTY_FILE_MESSAGE).
    pub async fn read_logs(&self, file_name: &str, config: Option<&LogFileConfig>) -> Result<String> {
        self.run("read logs", async {
            let strategy = self.strategy(file_name, config).await?;
            let mut strategy = strategy.lock().await;
            strategy.read().await
        })
        .await
    }

    pub async fn get_log_file_stats(
        &self,
        file_name: &str,
        config: Option<&LogFileConfig>,
    ) -> Result<LogFileStats> {
        self.run("get log file stats", async {
            let strategy = self.strategy(file_name, config).await?;
            let mut strategy = strategy.lock().await;
            Ok(strategy.stats().await)
        })
        .await
    }

    /// Forget every cached strategy; the next call re-attaches
    pub fn clear_strategy_cache(&self) {
        let dropped = self.cache.clear();
        tracing::debug!(dropped, "cleared strategy cache");
    }

    pub fn get_supported_formats() -> Vec<FormatDescriptor> {
        StrategyFactory::supported_formats()
    }

    /// Policy checks on a submitted configuration, without backend calls
    ///
    /// ```
    /// use rust_blob_logger::{BlobLogger, LoggingConfigOverrides};
    ///
    /// let report = BlobLogger::validate_logging_config(&LoggingConfigOverrides {
    ///     container_name: Some("Invalid-Name".to_string()),
    ///     directory: Some("../x".to_string()),
    ///     ..Default::default()
    /// });
    /// assert!(!report.is_valid);
    /// assert_eq!(report.errors.len(), 2);
    /// ```
    pub fn validate_logging_config(config: &LoggingConfigOverrides) -> ValidationReport {
        let mut errors = Vec::new();

        if let Some(name) = &config.container_name {
            errors.extend(check_container_name(name));
        }
        if let Some(directory) = &config.directory {
            errors.extend(check_directory(directory));
        }
        if let Some(megabytes) = config.max_file_size {
            errors.extend(check_max_file_size(megabytes));
        }
        if let Some(file_type) = &config.file_type {
            if !StrategyFactory::is_file_type_supported(file_type) {
                let supported = StrategyFactory::supported_file_types()
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(format!(
                    "Unsupported file type '{}'. Supported types: {}",
                    file_type, supported
                ));
            }
        }

        ValidationReport::from_errors(errors)
    }

    async fn strategy(&self, file_name: &str, config: Option<&LogFileConfig>) -> Result<SharedStrategy> {
        if file_name.trim().is_empty() {
            return Err(LoggerError::validation("file name must not be empty"));
        }

        let config = config.cloned().unwrap_or_default();
        let report = Self::validate_logging_config(&LoggingConfigOverrides::from(&config));
        if !report.is_valid {
            return Err(LoggerError::validation(report.errors.join("; ")));
        }

        self.cache.get_or_build(file_name, &config, &self.ctx).await
    }

    async fn run<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        op.await.map_err(|e| {
            self.ctx.metrics.record_failure();
            tracing::warn!(operation, error = %e, "log operation failed");
            LoggerError::operation(operation, e)
        })
    }
}
