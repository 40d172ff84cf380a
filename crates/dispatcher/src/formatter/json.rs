//! JSON renderings

use std::borrow::Cow;
use std::collections::BTreeMap;

use contracts::{BoundingBox, InferenceResult};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

pub(super) fn counts(result: &InferenceResult, counts: &BTreeMap<String, u32>) -> String {
    let mut object: Map<String, Value> = counts
        .iter()
        .map(|(name, count)| (name.clone(), Value::from(*count)))
        .collect();
    object.insert("timestamp".into(), Value::from(result.unix_timestamp()));
    Value::Object(object).to_string()
}

pub(super) fn faces(result: &InferenceResult, count: usize) -> String {
    serde_json::json!({
        "faces_in_frame_total": count,
        "faces_attending": count,
        "timestamp": result.unix_timestamp(),
    })
    .to_string()
}

#[derive(Serialize)]
struct FullReport<'a> {
    timestamp: i64,
    detection_count: usize,
    detections: Vec<FullDetection<'a>>,
}

#[derive(Serialize)]
struct FullDetection<'a> {
    class_id: i32,
    class_name: Cow<'a, str>,
    confidence: f32,
    bbox: BoundingBox,
}

pub(super) fn full(result: &InferenceResult, suppress_empty: bool) -> String {
    let detections: Vec<FullDetection<'_>> = result
        .selected_detections()
        .map(|d| FullDetection {
            class_id: d.class_id,
            class_name: result.class_name(d),
            confidence: d.confidence,
            bbox: d.bbox,
        })
        .collect();

    if suppress_empty && detections.is_empty() {
        return String::new();
    }

    let report = FullReport {
        timestamp: result.unix_timestamp(),
        detection_count: detections.len(),
        detections,
    };

    match serde_json::to_string(&report) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize full report");
            String::new()
        }
    }
}
