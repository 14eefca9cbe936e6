//! Metrics hooks for batch review operations.
//!
//! Implement [`ReviewMetrics`] to feed your monitoring system; the default
//! method bodies log via the `log` crate, and [`NoOpMetrics`] silences
//! everything. The session calls these hooks around its two network
//! round-trips and whenever the server's confirm result disagrees with the
//! local summary.

use std::time::Duration;

/// Trait for review metrics collection.
pub trait ReviewMetrics: Send + Sync {
    /// Record a completed eligibility load.
    fn record_load(&self, range: &str, items: usize, duration: Duration) {
        debug!("Load {}: {} item(s) in {:?}", range, items, duration);
    }

    /// Record a successful confirm submission.
    fn record_confirm(&self, batch_id: &str, duration: Duration) {
        debug!("Confirm {} took {:?}", batch_id, duration);
    }

    /// Record a total mismatch between client summary and server result.
    fn record_discrepancy(&self, expected: &str, actual: &str) {
        warn!(
            "Total discrepancy: client promised {}, server paid {}",
            expected, actual
        );
    }

    /// Record a failed operation.
    fn record_error(&self, operation: &str, error: &str) {
        warn!("Review ERROR in {}: {}", operation, error);
    }
}

/// Shared handlers forward through `Arc`, so one collector can serve many
/// sessions.
impl<M: ReviewMetrics + ?Sized> ReviewMetrics for std::sync::Arc<M> {
    fn record_load(&self, range: &str, items: usize, duration: Duration) {
        (**self).record_load(range, items, duration);
    }

    fn record_confirm(&self, batch_id: &str, duration: Duration) {
        (**self).record_confirm(batch_id, duration);
    }

    fn record_discrepancy(&self, expected: &str, actual: &str) {
        (**self).record_discrepancy(expected, actual);
    }

    fn record_error(&self, operation: &str, error: &str) {
        (**self).record_error(operation, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl ReviewMetrics for NoOpMetrics {
    fn record_load(&self, _range: &str, _items: usize, _duration: Duration) {}
    fn record_confirm(&self, _batch_id: &str, _duration: Duration) {}
    fn record_discrepancy(&self, _expected: &str, _actual: &str) {}
    fn record_error(&self, _operation: &str, _error: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_load("2024-01-01..2024-01-31", 3, Duration::from_millis(5));
        metrics.record_confirm("batch_1", Duration::from_millis(12));
        metrics.record_discrepancy("30.00", "20.00");
        metrics.record_error("confirm", "timeout");
    }
}
