//! Mock detection source
//!
//! Stands in for the inference loop when no model is available.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{BoundingBox, Detection, DetectionSet, MAX_DETECTIONS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{emission_interval, Result};
use crate::metrics::IngestionMetrics;

/// Classes the mock source draws from (COCO ids)
const MOCK_CLASSES: [(i32, &str); 4] = [(0, "person"), (1, "bicycle"), (2, "car"), (16, "dog")];

/// Mock detection source configuration
#[derive(Debug, Clone)]
pub struct MockDetectionConfig {
    /// Source ID used in logs and metrics
    pub source_id: String,

    /// Emission rate (sets per second)
    pub fps: f64,

    /// Upper bound of detections per set
    pub max_detections: usize,

    /// Probability that a detection is made invalid
    pub invalid_ratio: f64,

    /// Frame size boxes are placed in
    pub frame_width: i32,
    pub frame_height: i32,

    /// Stop after this many sets (None = unbounded)
    pub limit: Option<u64>,

    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for MockDetectionConfig {
    fn default() -> Self {
        Self {
            source_id: "mock".to_string(),
            fps: 10.0,
            max_detections: 6,
            invalid_ratio: 0.1,
            frame_width: 1280,
            frame_height: 720,
            limit: None,
            seed: None,
        }
    }
}

/// Mock detection source
///
/// Emits random COCO-style detection sets, including occasional invalid
/// entries, at a fixed rate.
pub struct MockDetectionSource {
    config: MockDetectionConfig,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl MockDetectionSource {
    /// Create a new mock source
    ///
    /// # Errors
    /// `fps` is zero, negative or not finite.
    pub fn new(config: MockDetectionConfig) -> Result<Self> {
        let interval = emission_interval(&config.source_id, config.fps)?;
        Ok(Self {
            config,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Mock source at `fps` with default settings
    pub fn with_fps(source_id: &str, fps: f64) -> Result<Self> {
        Self::new(MockDetectionConfig {
            source_id: source_id.to_string(),
            fps,
            ..Default::default()
        })
    }

    /// Start emitting, returning the receiving end
    ///
    /// The channel closes after `limit` sets, on `stop()`, or once the
    /// receiver is dropped.
    pub fn start(
        &self,
        channel_capacity: usize,
        metrics: Option<Arc<IngestionMetrics>>,
    ) -> mpsc::Receiver<DetectionSet> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let config = self.config.clone();
        let interval = self.interval;
        let running = self.running.clone();
        let metrics = metrics.unwrap_or_else(|| Arc::new(IngestionMetrics::new()));

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let mut emitted: u64 = 0;

            debug!(
                source_id = %config.source_id,
                fps = config.fps,
                limit = ?config.limit,
                "mock detection source started"
            );

            while running.load(Ordering::Relaxed) {
                if config.limit.is_some_and(|limit| emitted >= limit) {
                    break;
                }

                let set = DetectionSet::now(random_detections(&config, &mut rng));
                let count = set.detections.len();

                if tx.send(set).await.is_err() {
                    debug!(source_id = %config.source_id, "mock source channel closed");
                    break;
                }
                emitted += 1;
                metrics.record_emitted(&config.source_id, count);

                trace!(source_id = %config.source_id, emitted, detections = count, "mock set sent");

                tokio::time::sleep(interval).await;
            }

            running.store(false, Ordering::SeqCst);
            debug!(source_id = %config.source_id, emitted, "mock detection source stopped");
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

fn random_detections(config: &MockDetectionConfig, rng: &mut StdRng) -> Vec<Detection> {
    let count = rng.random_range(0..=config.max_detections.min(MAX_DETECTIONS));
    (0..count)
        .map(|_| {
            let (class_id, class_name) = MOCK_CLASSES[rng.random_range(0..MOCK_CLASSES.len())];
            let left = rng.random_range(0..config.frame_width.max(2) / 2);
            let top = rng.random_range(0..config.frame_height.max(2) / 2);
            let bbox = BoundingBox {
                left,
                top,
                right: left + rng.random_range(1..=config.frame_width.max(2) / 2),
                bottom: top + rng.random_range(1..=config.frame_height.max(2) / 2),
            };
            let mut detection =
                Detection::new(class_id, class_name, rng.random_range(0.25..1.0), bbox);

            if rng.random_bool(config.invalid_ratio.clamp(0.0, 1.0)) {
                if rng.random_bool(0.5) {
                    detection.confidence = 0.0;
                } else {
                    detection.class_id = -1;
                }
            }
            detection
        })
        .collect()
}
