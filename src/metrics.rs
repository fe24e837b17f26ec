use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing classification activity.
#[derive(Default)]
pub struct ClassifierMetrics {
    documents_submitted: AtomicU64,
    batches_submitted: AtomicU64,
    batches_failed: AtomicU64,
}

impl ClassifierMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch handed to the remote service and whether the call succeeded.
    pub fn record_batch(&self, documents: u64, succeeded: bool) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.documents_submitted
            .fetch_add(documents, Ordering::Relaxed);
        if !succeeded {
            self.batches_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_submitted: self.documents_submitted.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of classification counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents submitted to the remote service since startup.
    pub documents_submitted: u64,
    /// Number of remote calls issued.
    pub batches_submitted: u64,
    /// Number of remote calls that failed as a whole.
    pub batches_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_batches_and_failures() {
        let metrics = ClassifierMetrics::new();
        metrics.record_batch(5, true);
        metrics.record_batch(2, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_submitted, 7);
        assert_eq!(snapshot.batches_submitted, 2);
        assert_eq!(snapshot.batches_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(ClassifierMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
