//! Publisher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single publisher
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Results popped from the mailbox
    received_count: AtomicU64,
    /// Messages handed to the transport successfully
    sent_count: AtomicU64,
    /// Cycles where the formatter produced nothing to send
    suppressed_count: AtomicU64,
    /// Cycles skipped because the transport was not connected
    disconnected_count: AtomicU64,
    /// Failed sends
    failure_count: AtomicU64,
    /// Pending results overwritten before being popped
    overwritten_count: AtomicU64,
}

impl PublisherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received_count(&self) -> u64 {
        self.received_count.load(Ordering::Relaxed)
    }

    pub fn inc_received_count(&self) {
        self.received_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn suppressed_count(&self) -> u64 {
        self.suppressed_count.load(Ordering::Relaxed)
    }

    pub fn inc_suppressed_count(&self) {
        self.suppressed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn disconnected_count(&self) -> u64 {
        self.disconnected_count.load(Ordering::Relaxed)
    }

    pub fn inc_disconnected_count(&self) {
        self.disconnected_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overwritten_count(&self) -> u64 {
        self.overwritten_count.load(Ordering::Relaxed)
    }

    pub fn inc_overwritten_count(&self) {
        self.overwritten_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received_count: self.received_count(),
            sent_count: self.sent_count(),
            suppressed_count: self.suppressed_count(),
            disconnected_count: self.disconnected_count(),
            failure_count: self.failure_count(),
            overwritten_count: self.overwritten_count(),
        }
    }
}

/// Snapshot of publisher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received_count: u64,
    pub sent_count: u64,
    pub suppressed_count: u64,
    pub disconnected_count: u64,
    pub failure_count: u64,
    pub overwritten_count: u64,
}
