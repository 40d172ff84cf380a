//! Distribution pipeline metrics
//!
//! Prometheus-facing recorders plus an in-memory aggregator for run summaries.

use std::collections::HashMap;

use contracts::InferenceResult;
use metrics::{counter, gauge, histogram};

/// Record a result handed to the publishers
///
/// Called once per producer cycle, before fan-out.
pub fn record_result_produced(result: &InferenceResult) {
    counter!("relay_results_produced_total").increment(1);

    let total = result.detections.len();
    let valid = result.valid_detections().count();
    histogram!("relay_detections_per_result").record(total as f64);
    gauge!("relay_valid_detections_current").set(valid as f64);

    if total > valid {
        counter!("relay_invalid_detections_total").increment((total - valid) as u64);
    }
}

/// Record the outcome of one publisher cycle
///
/// `status` is one of `sent`, `suppressed`, `disconnected`, `failed`.
pub fn record_message_published(publisher: &str, status: &'static str) {
    counter!(
        "relay_messages_published_total",
        "publisher" => publisher.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a pending result replaced before its publisher drained it
pub fn record_mailbox_overwrite(publisher: &str) {
    counter!(
        "relay_mailbox_overwrites_total",
        "publisher" => publisher.to_string()
    )
    .increment(1);
}

/// Record time spent inside a transport send
pub fn record_send_latency_ms(publisher: &str, latency_ms: f64) {
    histogram!(
        "relay_send_latency_ms",
        "publisher" => publisher.to_string()
    )
    .record(latency_ms);
}

/// Result metrics aggregator
///
/// Aggregates per-result statistics in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct ResultStatsAggregator {
    /// Results produced
    pub total_results: u64,

    /// Detections seen, valid or not
    pub total_detections: u64,

    /// Detections dropped by the validity check
    pub total_invalid: u64,

    /// Results with no valid, selected detection
    pub empty_results: u64,

    /// Selected detections per result
    pub selected_stats: RunningStats,

    /// Selected detections per class name
    pub class_counts: HashMap<String, u64>,
}

impl ResultStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one result into the aggregate
    pub fn update(&mut self, result: &InferenceResult) {
        self.total_results += 1;
        self.total_detections += result.detections.len() as u64;

        let valid = result.valid_detections().count() as u64;
        self.total_invalid += result.detections.len() as u64 - valid;

        let mut selected = 0u64;
        for detection in result.selected_detections() {
            selected += 1;
            *self
                .class_counts
                .entry(result.class_name(detection).into_owned())
                .or_insert(0) += 1;
        }

        if selected == 0 {
            self.empty_results += 1;
        }
        self.selected_stats.push(selected as f64);
    }

    /// Build a summary report
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            total_results: self.total_results,
            total_detections: self.total_detections,
            total_invalid: self.total_invalid,
            empty_results: self.empty_results,
            empty_rate: if self.total_results > 0 {
                self.empty_results as f64 / self.total_results as f64 * 100.0
            } else {
                0.0
            },
            selected_per_result: StatsSummary::from(&self.selected_stats),
            class_counts: self.class_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result metrics summary
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub total_results: u64,
    pub total_detections: u64,
    pub total_invalid: u64,
    pub empty_results: u64,
    pub empty_rate: f64,
    pub selected_per_result: StatsSummary,
    pub class_counts: HashMap<String, u64>,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Result Metrics Summary ===")?;
        writeln!(f, "Total results: {}", self.total_results)?;
        writeln!(f, "Total detections: {}", self.total_detections)?;
        writeln!(f, "Invalid detections: {}", self.total_invalid)?;
        writeln!(
            f,
            "Empty results: {} ({:.2}%)",
            self.empty_results, self.empty_rate
        )?;
        writeln!(f, "Selected per result: {}", self.selected_per_result)?;

        if !self.class_counts.is_empty() {
            writeln!(f, "Class counts:")?;
            let mut classes: Vec<_> = self.class_counts.iter().collect();
            classes.sort();
            for (class, count) in classes {
                writeln!(f, "  {}: {}", class, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
