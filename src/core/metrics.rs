//! Logger metrics for observability
//!
//! Counters for logger health: events written, events lost to device
//! failures, events no channel accepted, and payloads that could not be
//! serialized. Device failures never reach the caller, so these counters are
//! how they are observed.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by a logger and its callers
///
/// # Example
///
/// ```
/// use rust_json_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_unrouted();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.total_logged, 1);
/// assert_eq!(snapshot.unrouted, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    logged: AtomicU64,
    dropped: AtomicU64,
    unrouted: AtomicU64,
    serialization_failures: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`LoggerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Events written to every channel they were routed to
    pub total_logged: u64,
    /// Events lost because at least one routed device write failed
    pub dropped: u64,
    /// Events no channel accepted
    pub unrouted: u64,
    /// Events whose document could not be serialized
    pub serialization_failures: u64,
    /// Individual device write failures, one per failed channel
    pub write_failures: u64,
}

impl MetricsSnapshot {
    /// Percentage of routed events lost to device failures
    pub fn drop_rate(&self) -> f64 {
        let attempted = self.total_logged + self.dropped;
        if attempted == 0 {
            return 0.0;
        }
        self.dropped as f64 * 100.0 / attempted as f64
    }
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            logged: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            unrouted: AtomicU64::new(0),
            serialization_failures: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    pub fn total_logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn unrouted_count(&self) -> u64 {
        self.unrouted.load(Ordering::Relaxed)
    }

    pub fn serialization_failures(&self) -> u64 {
        self.serialization_failures.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    // The record_* methods return the previous count.

    pub fn record_logged(&self) -> u64 {
        bump(&self.logged)
    }

    pub fn record_dropped(&self) -> u64 {
        bump(&self.dropped)
    }

    pub fn record_unrouted(&self) -> u64 {
        bump(&self.unrouted)
    }

    pub fn record_serialization_failure(&self) -> u64 {
        bump(&self.serialization_failures)
    }

    pub fn record_write_failure(&self) -> u64 {
        bump(&self.write_failures)
    }

    pub fn drop_rate(&self) -> f64 {
        self.snapshot().drop_rate()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_logged: self.total_logged(),
            dropped: self.dropped_count(),
            unrouted: self.unrouted_count(),
            serialization_failures: self.serialization_failures(),
            write_failures: self.write_failures(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.logged,
            &self.dropped,
            &self.unrouted,
            &self.serialization_failures,
            &self.write_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(LoggerMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_returns_previous() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.record_unrouted(), 0);
        assert_eq!(metrics.record_unrouted(), 1);
        assert_eq!(metrics.unrouted_count(), 2);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_logged();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        // Unrouted events are a configuration issue, not losses
        metrics.record_unrouted();

        let rate = metrics.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_reset() {
        let metrics = LoggerMetrics::new();
        metrics.record_dropped();
        metrics.record_logged();
        metrics.record_serialization_failure();
        metrics.record_write_failure();

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_logged();

        let snapshot = metrics.snapshot();
        metrics.record_logged();

        assert_eq!(snapshot.total_logged, 2);
        assert_eq!(metrics.total_logged(), 3);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = LoggerMetrics::new();
        metrics.record_write_failure();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["write_failures"], 1);
        assert_eq!(json["total_logged"], 0);
    }
}
