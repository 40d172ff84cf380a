//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::{DispatchReport, MetricsSnapshot};
use ingestion::MetricsSnapshot as SourceSnapshot;
use observability::ResultSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Detection sets produced by the source
    pub sets_emitted: u64,

    /// Detections contained in those sets
    pub detections_emitted: u64,

    /// Results handed to the publishers
    pub results_dispatched: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-result aggregates
    pub summary: ResultSummary,

    /// Final counters per publisher
    pub publishers: Vec<(String, MetricsSnapshot)>,
}

impl PipelineStats {
    pub fn from_report(report: DispatchReport, source: SourceSnapshot, duration: Duration) -> Self {
        Self {
            sets_emitted: source.sets_emitted,
            detections_emitted: source.detections_emitted,
            results_dispatched: report.results,
            duration,
            summary: report.summary,
            publishers: report.publishers,
        }
    }

    /// Results dispatched per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.results_dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Messages actually delivered across all publishers
    pub fn total_sent(&self) -> u64 {
        self.publishers.iter().map(|(_, m)| m.sent_count).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sets emitted: {}", self.sets_emitted);
        println!("   ├─ Results dispatched: {}", self.results_dispatched);
        println!("   ├─ Rate: {:.2}/s", self.rate());
        println!("   └─ Messages sent: {}", self.total_sent());

        let summary = &self.summary;
        println!("\n📈 Detections");
        println!("   ├─ Total: {}", summary.total_detections);
        println!("   ├─ Invalid: {}", summary.total_invalid);
        println!(
            "   ├─ Empty results: {} ({:.2}%)",
            summary.empty_results, summary.empty_rate
        );
        println!("   └─ Selected per result: {}", summary.selected_per_result);

        if !summary.class_counts.is_empty() {
            let mut classes: Vec<_> = summary.class_counts.iter().collect();
            classes.sort();
            println!("\n🏷️  Class Counts");
            for (i, (class, count)) in classes.iter().enumerate() {
                let prefix = if i == classes.len() - 1 { "└─" } else { "├─" };
                println!("   {} {}: {}", prefix, class, count);
            }
        }

        if !self.publishers.is_empty() {
            println!("\n📤 Publishers");
            for (i, (name, m)) in self.publishers.iter().enumerate() {
                let prefix = if i == self.publishers.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: sent {}, suppressed {}, disconnected {}, failed {}, overwritten {}",
                    prefix,
                    name,
                    m.sent_count,
                    m.suppressed_count,
                    m.disconnected_count,
                    m.failure_count,
                    m.overwritten_count
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_and_totals() {
        let sent = |n| MetricsSnapshot {
            sent_count: n,
            ..Default::default()
        };
        let stats = PipelineStats {
            results_dispatched: 20,
            duration: Duration::from_secs(4),
            publishers: vec![("a".into(), sent(3)), ("b".into(), sent(4))],
            ..Default::default()
        };

        assert!((stats.rate() - 5.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_sent(), 7);
        assert_eq!(PipelineStats::default().rate(), 0.0);
    }
}
