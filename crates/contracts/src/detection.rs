//! DetectionSet - inference loop output
//!
//! Raw per-frame detections as handed over by the external inference step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of detections carried by one result
pub const MAX_DETECTIONS: usize = 128;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// One recognized object instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class index (negative values mark unusable entries)
    pub class_id: i32,

    /// Class label as reported by the model (may be empty)
    #[serde(default)]
    pub class_name: String,

    /// Confidence score
    pub confidence: f32,

    /// Bounding box
    #[serde(default, rename = "box")]
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a detection
    pub fn new(class_id: i32, class_name: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    /// A detection is usable iff it has a positive score and a non-negative class id
    pub fn is_valid(&self) -> bool {
        self.confidence > 0.0 && self.class_id >= 0
    }
}

/// Detections produced by one inference cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    /// Frame capture time
    pub timestamp: DateTime<Utc>,

    /// Detections in model output order
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionSet {
    /// Create a detection set stamped with the given time
    pub fn new(timestamp: DateTime<Utc>, detections: Vec<Detection>) -> Self {
        Self {
            timestamp,
            detections,
        }
    }

    /// Create a detection set stamped with the current time
    pub fn now(detections: Vec<Detection>) -> Self {
        Self::new(Utc::now(), detections)
    }
}
