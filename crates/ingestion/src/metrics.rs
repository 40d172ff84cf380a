//! Source metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Detection sets handed downstream
    pub sets_emitted: AtomicU64,

    /// Detections carried by those sets
    pub detections_emitted: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one emitted set
    pub fn record_emitted(&self, source_id: &str, detections: usize) {
        self.sets_emitted.fetch_add(1, Ordering::Relaxed);
        self.detections_emitted
            .fetch_add(detections as u64, Ordering::Relaxed);

        metrics::counter!(
            "relay_detection_sets_emitted_total",
            "source" => source_id.to_string()
        )
        .increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sets_emitted: self.sets_emitted.load(Ordering::Relaxed),
            detections_emitted: self.detections_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sets_emitted: u64,
    pub detections_emitted: u64,
}
