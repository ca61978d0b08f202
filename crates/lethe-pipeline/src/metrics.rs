//! Pipeline counters
//!
//! Cheap relaxed atomics incremented on the hot path, snapshotted for
//! operational introspection.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the service surface and the flusher task
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Calls admitted past the rate limiter
    pub records_admitted: AtomicU64,
    /// Calls silently dropped by the rate limiter
    pub records_dropped: AtomicU64,
    /// Records durably committed
    pub records_flushed: AtomicU64,
    /// Batches that failed permanently after exhausting retries
    pub flush_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create a new metrics instance
    pub const fn new() -> Self {
        Self {
            records_admitted: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            records_flushed: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_admitted(&self) {
        self.records_admitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_flushed(&self, count: u64) {
        self.records_flushed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn flush_failed(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_admitted: self.records_admitted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_admitted: u64,
    pub records_dropped: u64,
    pub records_flushed: u64,
    pub flush_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_dropped();
        metrics.record_flushed(10);
        metrics.flush_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_admitted, 2);
        assert_eq!(snapshot.records_dropped, 1);
        assert_eq!(snapshot.records_flushed, 10);
        assert_eq!(snapshot.flush_failures, 1);
    }
}
