//! # Ingestion
//!
//! Detection set sources feeding the dispatcher.
//!
//! Responsibilities:
//! - Stand in for the external inference loop (mock, replay)
//! - Emit `DetectionSet`s at a fixed rate over a tokio mpsc channel
//! - Close the channel at end of input so the pipeline shuts down
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{MockDetectionSource, ReplayConfig, ReplaySource};
//!
//! let source = MockDetectionSource::with_fps("mock", 10.0)?;
//! let rx = source.start(16, None);
//!
//! let replay = ReplaySource::load(Path::new("capture.jsonl"), ReplayConfig::default())?;
//! let rx = replay.start(16, None);
//! ```

mod error;
mod metrics;
mod mock;
mod replay;

pub use contracts::DetectionSet;
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{MockDetectionConfig, MockDetectionSource};
pub use replay::{ReplayConfig, ReplaySource};
