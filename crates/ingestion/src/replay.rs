//! Replay source
//!
//! Emits recorded detection sets from a JSON-lines file, one `DetectionSet`
//! per non-blank line.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::DetectionSet;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::error::{emission_interval, IngestionError, Result};
use crate::metrics::IngestionMetrics;

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Source ID used in logs and metrics
    pub source_id: String,
    /// Emission rate (sets per second)
    pub fps: f64,
    /// Start over after the last set
    pub looping: bool,
    /// Stop after this many sets (None = file length, or unbounded when looping)
    pub limit: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            source_id: "replay".to_string(),
            fps: 10.0,
            looping: false,
            limit: None,
        }
    }
}

/// Source replaying recorded detection sets
pub struct ReplaySource {
    config: ReplayConfig,
    sets: Arc<Vec<DetectionSet>>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Load a JSON-lines replay file
    ///
    /// # Errors
    /// - File read failure
    /// - Malformed line
    /// - No detection sets
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| IngestionError::ReplayRead {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        let sets = parse_lines(&content, &path_str)?;
        if sets.is_empty() {
            return Err(IngestionError::EmptyReplay { path: path_str });
        }

        info!(path = %path_str, sets = sets.len(), looping = config.looping, "replay loaded");
        Self::from_sets(sets, config)
    }

    /// Replay in-memory sets
    pub fn from_sets(sets: Vec<DetectionSet>, config: ReplayConfig) -> Result<Self> {
        let interval = emission_interval(&config.source_id, config.fps)?;
        Ok(Self {
            config,
            sets: Arc::new(sets),
            interval,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Number of recorded sets
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Start emitting, returning the receiving end
    ///
    /// Without looping the channel closes after the last set.
    pub fn start(
        &self,
        channel_capacity: usize,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> mpsc::Receiver<DetectionSet> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let config = self.config.clone();
        let interval = self.interval;
        let sets = Arc::clone(&self.sets);
        let running = self.running.clone();
        let metrics = metrics.unwrap_or_else(|| Arc::new(IngestionMetrics::new()));

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut emitted: u64 = 0;

            debug!(source_id = %config.source_id, sets = sets.len(), "replay source started");

            'replay: loop {
                for set in sets.iter() {
                    if !running.load(Ordering::Relaxed)
                        || config.limit.is_some_and(|limit| emitted >= limit)
                    {
                        break 'replay;
                    }

                    let count = set.detections.len();
                    if tx.send(set.clone()).await.is_err() {
                        debug!(source_id = %config.source_id, "replay channel closed");
                        break 'replay;
                    }
                    emitted += 1;
                    metrics.record_emitted(&config.source_id, count);
                    trace!(source_id = %config.source_id, emitted, "replay set sent");

                    tokio::time::sleep(interval).await;
                }

                if !config.looping || sets.is_empty() {
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
            debug!(source_id = %config.source_id, emitted, "replay source stopped");
        });

        rx
    }

    /// Stop the source
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

fn parse_lines(content: &str, path: &str) -> Result<Vec<DetectionSet>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| IngestionError::ReplayParse {
                path: path.to_string(),
                line: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINES: &str = r#"{"timestamp":"2024-05-08T19:26:49Z","detections":[{"class_id":0,"class_name":"person","confidence":0.9}]}

{"timestamp":"2024-05-08T19:26:50Z","detections":[]}
"#;

    fn fast(looping: bool, limit: Option<u64>) -> ReplayConfig {
        ReplayConfig {
            source_id: "test_replay".to_string(),
            fps: 500.0,
            looping,
            limit,
        }
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let sets = parse_lines(LINES, "mem").unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].detections.len(), 1);
        assert_eq!(sets[1].timestamp.timestamp(), 1_715_196_410);
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let content = "{\"timestamp\":\"2024-05-08T19:26:49Z\"}\nnot json\n";
        let err = parse_lines(content, "mem").unwrap_err();
        assert!(matches!(err, IngestionError::ReplayParse { line: 2, .. }));
    }

    #[test]
    fn test_rejects_tiny_fps() {
        let sets = parse_lines(LINES, "mem").unwrap();
        let config = ReplayConfig {
            fps: f64::MIN_POSITIVE,
            ..fast(false, None)
        };
        let result = ReplaySource::from_sets(sets, config);
        assert!(matches!(result, Err(IngestionError::InvalidRate { .. })));
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = ReplaySource::load(file.path(), fast(false, None));
        assert!(matches!(result, Err(IngestionError::EmptyReplay { .. })));
    }

    #[tokio::test]
    async fn test_replay_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LINES.as_bytes()).unwrap();

        let source = ReplaySource::load(file.path(), fast(false, None)).unwrap();
        assert_eq!(source.len(), 2);

        let mut rx = source.start(4, None);
        let mut timestamps = Vec::new();
        while let Some(set) = rx.recv().await {
            timestamps.push(set.timestamp.timestamp());
        }
        assert_eq!(timestamps, vec![1_715_196_409, 1_715_196_410]);
    }

    #[tokio::test]
    async fn test_replay_loop_with_limit() {
        let sets = parse_lines(LINES, "mem").unwrap();
        let source = ReplaySource::from_sets(sets, fast(true, Some(5))).unwrap();
        let metrics = Arc::new(IngestionMetrics::new());

        let mut rx = source.start(8, Some(Arc::clone(&metrics)));
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }

        assert_eq!(received, 5);
        assert_eq!(metrics.snapshot().sets_emitted, 5);
        assert_eq!(metrics.snapshot().detections_emitted, 3);
    }
}
