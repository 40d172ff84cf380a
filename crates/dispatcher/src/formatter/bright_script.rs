//! BrightScript variable renderings: `key:value!!key:value!!timestamp:<t>`

use std::collections::BTreeMap;

use contracts::InferenceResult;

const SEPARATOR: &str = "!!";

fn render<'a>(result: &InferenceResult, fields: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut parts: Vec<String> = fields
        .into_iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect();
    parts.push(format!("timestamp:{}", result.unix_timestamp()));
    parts.join(SEPARATOR)
}

pub(super) fn detection_count(result: &InferenceResult, count: usize) -> String {
    render(result, [("detection_count", count.to_string())])
}

pub(super) fn faces(result: &InferenceResult, count: usize) -> String {
    render(
        result,
        [
            ("faces_in_frame_total", count.to_string()),
            ("faces_attending", count.to_string()),
        ],
    )
}

pub(super) fn counts(result: &InferenceResult, counts: &BTreeMap<String, u32>) -> String {
    render(
        result,
        counts
            .iter()
            .map(|(name, count)| (name.as_str(), count.to_string())),
    )
}
