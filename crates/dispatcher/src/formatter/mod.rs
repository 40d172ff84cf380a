//! Formatter strategy
//!
//! Pure conversion of an [`InferenceResult`] into a sink-specific wire string.
//! Every variant discards invalid detections before looking at anything else.

mod bright_script;
mod json;

use std::collections::BTreeMap;

use contracts::{ClassNameMapping, FormatterConfig, FormatterKind, InferenceResult, PRIMARY_CLASS_ID};

/// Class name always present in count tables
pub const PERSON_CLASS_NAME: &str = "person";

/// Closed set of output formats
#[derive(Debug, Clone, PartialEq)]
pub enum Formatter {
    /// Per-class counts as JSON
    Json,
    /// Valid detection count as BrightScript variables
    BrightScriptVariable,
    /// Person count as faces_* JSON
    FacesJson,
    /// Person count as faces_* BrightScript variables
    FacesBs,
    /// Selected per-class counts as JSON, names renamed by `mapping`
    SelectiveJson { mapping: ClassNameMapping },
    /// Selected per-class counts as BrightScript variables
    SelectiveBs { mapping: ClassNameMapping },
    /// Every selected detection with score and box
    FullJson { suppress_empty: bool },
}

impl Formatter {
    /// Build a formatter from its blueprint entry
    pub fn from_config(config: &FormatterConfig) -> Self {
        match config.kind {
            FormatterKind::Json => Self::Json,
            FormatterKind::BrightScriptVariable => Self::BrightScriptVariable,
            FormatterKind::FacesJson => Self::FacesJson,
            FormatterKind::FacesBs => Self::FacesBs,
            FormatterKind::SelectiveJson => Self::SelectiveJson {
                mapping: config.class_mapping.clone(),
            },
            FormatterKind::SelectiveBs => Self::SelectiveBs {
                mapping: config.class_mapping.clone(),
            },
            FormatterKind::FullJson => Self::FullJson {
                suppress_empty: config.suppress_empty,
            },
        }
    }

    pub fn kind(&self) -> FormatterKind {
        match self {
            Self::Json => FormatterKind::Json,
            Self::BrightScriptVariable => FormatterKind::BrightScriptVariable,
            Self::FacesJson => FormatterKind::FacesJson,
            Self::FacesBs => FormatterKind::FacesBs,
            Self::SelectiveJson { .. } => FormatterKind::SelectiveJson,
            Self::SelectiveBs { .. } => FormatterKind::SelectiveBs,
            Self::FullJson { .. } => FormatterKind::FullJson,
        }
    }

    /// Render a result
    ///
    /// An empty string means "nothing to send" and is only produced by
    /// `FullJson` with `suppress_empty` set.
    pub fn format(&self, result: &InferenceResult) -> String {
        match self {
            Self::Json => json::counts(result, &class_counts(result, None)),
            Self::BrightScriptVariable => {
                bright_script::detection_count(result, result.valid_detections().count())
            }
            Self::FacesJson => json::faces(result, primary_count(result)),
            Self::FacesBs => bright_script::faces(result, primary_count(result)),
            Self::SelectiveJson { mapping } => {
                json::counts(result, &class_counts(result, Some(mapping)))
            }
            Self::SelectiveBs { mapping } => {
                bright_script::counts(result, &class_counts(result, Some(mapping)))
            }
            Self::FullJson { suppress_empty } => json::full(result, *suppress_empty),
        }
    }
}

/// Count valid, filter-selected detections per class name
///
/// Names are resolved through the result, then renamed by `mapping`.
/// `"person"` is always present, with a floor of zero.
pub fn class_counts(
    result: &InferenceResult,
    mapping: Option<&ClassNameMapping>,
) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::from([(PERSON_CLASS_NAME.to_string(), 0)]);

    for detection in result.selected_detections() {
        let name = result.class_name(detection);
        let name = match mapping {
            Some(mapping) => mapping.apply(&name).to_string(),
            None => name.into_owned(),
        };
        *counts.entry(name).or_insert(0) += 1;
    }

    counts
}

/// Valid detections of the primary class, filter ignored
fn primary_count(result: &InferenceResult) -> usize {
    result
        .valid_detections()
        .filter(|d| d.class_id == PRIMARY_CLASS_ID)
        .count()
}
