//! Observability metrics for admission control.
//!
//! Provides counters about admission behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Total number of requests admitted
    requests_admitted: AtomicU64,
    /// Total number of requests rejected
    requests_rejected: AtomicU64,
    /// Total number of counters removed by sweeps
    entries_swept: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_admitted: AtomicU64::new(0),
                requests_rejected: AtomicU64::new(0),
                entries_swept: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: usize) {
        self.inner
            .entries_swept
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of requests admitted.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of requests rejected.
    pub fn requests_rejected(&self) -> u64 {
        self.inner.requests_rejected.load(Ordering::Relaxed)
    }

    /// Get the total number of counters removed by sweeps.
    pub fn entries_swept(&self) -> u64 {
        self.inner.entries_swept.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_rejected: self.requests_rejected(),
            entries_swept: self.entries_swept(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.requests_admitted.store(0, Ordering::Relaxed);
        self.inner.requests_rejected.store(0, Ordering::Relaxed);
        self.inner.entries_swept.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of requests admitted
    pub requests_admitted: u64,
    /// Total number of requests rejected
    pub requests_rejected: u64,
    /// Total number of counters removed by sweeps
    pub entries_swept: u64,
}

impl MetricsSnapshot {
    /// Calculate the rejection rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been checked.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_rejected as f64 / total as f64
        }
    }

    /// Get the total number of requests checked (admitted + rejected).
    pub fn total_requests(&self) -> u64 {
        self.requests_admitted.saturating_add(self.requests_rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.requests_admitted(), 0);
        assert_eq!(metrics.requests_rejected(), 0);
        assert_eq!(metrics.entries_swept(), 0);
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_swept(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_admitted, 3);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.entries_swept, 4);
        assert_eq!(snapshot.total_requests(), 4);
        assert!((snapshot.rejection_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejection_rate_empty() {
        assert_eq!(Metrics::new().snapshot().rejection_rate(), 0.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.record_rejected();
        assert_eq!(metrics.requests_rejected(), 1);

        metrics.reset();
        assert_eq!(clone.snapshot().total_requests(), 0);
    }
}
