//! Logger metrics for observability
//!
//! Counters describing how much work the engine has pushed to the backend and
//! how often the strategy cache saved a round-trip.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_blob_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_entries(3);
/// metrics.record_write_call(120);
///
/// assert_eq!(metrics.entries_written(), 3);
/// assert_eq!(metrics.bytes_written(), 120);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    /// Strategies constructed and initialized
    strategies_built: AtomicU64,

    /// Lookups answered by an already cached strategy
    cache_hits: AtomicU64,

    /// Entries accepted by a writer
    entries_written: AtomicU64,

    /// Payload bytes handed to the backend
    bytes_written: AtomicU64,

    /// Individual backend write calls (append blocks or whole uploads)
    write_calls: AtomicU64,

    /// Files rotated because they reached the size threshold
    rotations: AtomicU64,

    /// Public operations that returned an error
    failed_operations: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            strategies_built: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            entries_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_calls: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            failed_operations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn strategies_built(&self) -> u64 {
        self.strategies_built.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entries_written(&self) -> u64 {
        self.entries_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_operations(&self) -> u64 {
        self.failed_operations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_strategy_built(&self) -> u64 {
        self.strategies_built.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_cache_hit(&self) -> u64 {
        self.cache_hits.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_entries(&self, count: u64) -> u64 {
        self.entries_written.fetch_add(count, Ordering::Relaxed)
    }

    /// Record one backend write call carrying `bytes` of payload
    #[inline]
    pub fn record_write_call(&self, bytes: u64) -> u64 {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.write_calls.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rotation(&self) -> u64 {
        self.rotations.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failure(&self) -> u64 {
        self.failed_operations.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of strategy lookups served from cache, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no lookups have happened.
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits() as f64;
        let total = hits + self.strategies_built() as f64;
        if total == 0.0 {
            0.0
        } else {
            (hits / total) * 100.0
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.strategies_built.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.entries_written.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.write_calls.store(0, Ordering::Relaxed);
        self.rotations.store(0, Ordering::Relaxed);
        self.failed_operations.store(0, Ordering::Relaxed);
    }
}
