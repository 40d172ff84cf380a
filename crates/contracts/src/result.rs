//! InferenceResult - Dispatcher input
//!
//! Immutable per-cycle snapshot shared read-only by every publisher,
//! together with the class filter and name tables that shape formatting.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Detection, DetectionSet, MAX_DETECTIONS};

/// Name used when a detection carries no label and no table entry exists
pub const UNKNOWN_CLASS_NAME: &str = "unknown";

/// Class id of the primary subject ("person" in COCO)
pub const PRIMARY_CLASS_ID: i32 = 0;

/// Class id -> class name lookup table
pub type ClassTable = HashMap<i32, String>;

/// Set of class ids eligible for output
///
/// An empty filter selects every class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassFilter {
    ids: BTreeSet<i32>,
}

impl ClassFilter {
    /// Filter selecting all classes
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter selecting exactly the given ids
    pub fn from_ids(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Add the primary class to the filter
    pub fn with_primary(mut self) -> Self {
        self.ids.insert(PRIMARY_CLASS_ID);
        self
    }

    /// Whether `class_id` passes the filter
    pub fn is_selected(&self, class_id: i32) -> bool {
        if self.ids.is_empty() {
            return true;
        }
        self.ids.contains(&class_id)
    }

    /// True when the filter selects all classes
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Output rename table applied to resolved class names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNameMapping {
    names: HashMap<String, String>,
}

impl ClassNameMapping {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Renamed label, or the original when no entry exists
    pub fn apply<'a>(&'a self, name: &'a str) -> &'a str {
        self.names.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ClassNameMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Class filter and id -> name table resolved before pipeline start
#[derive(Debug, Clone, Default)]
pub struct ClassSelection {
    pub filter: ClassFilter,
    pub table: Option<Arc<ClassTable>>,
}

impl ClassSelection {
    pub fn new(filter: ClassFilter, table: Option<ClassTable>) -> Self {
        Self {
            filter,
            table: table.map(Arc::new),
        }
    }
}

/// One inference cycle's snapshot
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// Frame capture time
    pub timestamp: DateTime<Utc>,

    /// Detections, at most [`MAX_DETECTIONS`]
    pub detections: Vec<Detection>,

    /// Filter active when the result was produced
    pub selected_classes: ClassFilter,

    /// Optional id -> name table
    pub class_table: Option<Arc<ClassTable>>,
}

impl InferenceResult {
    /// Create a result, truncating detections beyond capacity
    pub fn new(
        timestamp: DateTime<Utc>,
        mut detections: Vec<Detection>,
        selected_classes: ClassFilter,
        class_table: Option<Arc<ClassTable>>,
    ) -> Self {
        detections.truncate(MAX_DETECTIONS);
        Self {
            timestamp,
            detections,
            selected_classes,
            class_table,
        }
    }

    /// Wrap a detection set with the active class selection
    pub fn from_detection_set(set: DetectionSet, selection: &ClassSelection) -> Self {
        Self::new(
            set.timestamp,
            set.detections,
            selection.filter.clone(),
            selection.table.clone(),
        )
    }

    /// Capture time as unix seconds
    pub fn unix_timestamp(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// Detections passing the validity check
    pub fn valid_detections(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| d.is_valid())
    }

    /// Valid detections whose class passes the active filter
    pub fn selected_detections(&self) -> impl Iterator<Item = &Detection> {
        self.valid_detections()
            .filter(|d| self.selected_classes.is_selected(d.class_id))
    }

    /// Resolve the display name of a detection
    ///
    /// Prefers the detection's own label, then the class table.
    pub fn class_name<'a>(&'a self, detection: &'a Detection) -> Cow<'a, str> {
        if !detection.class_name.is_empty() {
            return Cow::Borrowed(detection.class_name.as_str());
        }
        self.class_table
            .as_ref()
            .and_then(|table| table.get(&detection.class_id))
            .map(|name| Cow::Owned(name.clone()))
            .unwrap_or(Cow::Borrowed(UNKNOWN_CLASS_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundingBox;

    #[test]
    fn test_empty_filter_selects_everything() {
        let filter = ClassFilter::all();
        for id in [-5, 0, 1, 2, 79, 1000] {
            assert!(filter.is_selected(id));
        }
    }

    #[test]
    fn test_non_empty_filter_is_membership() {
        let filter = ClassFilter::from_ids([0, 2]);
        for id in -3..100 {
            assert_eq!(filter.is_selected(id), id == 0 || id == 2, "id {id}");
        }
    }

    #[test]
    fn test_with_primary() {
        let filter = ClassFilter::from_ids([2, 16]).with_primary();
        assert!(filter.is_selected(PRIMARY_CLASS_ID));
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_mapping_apply() {
        let mapping: ClassNameMapping = [("person", "faces")].into_iter().collect();
        assert_eq!(mapping.apply("person"), "faces");
        assert_eq!(mapping.apply("car"), "car");
    }

    #[test]
    fn test_truncates_to_capacity() {
        let detections =
            vec![Detection::new(0, "person", 0.5, BoundingBox::default()); MAX_DETECTIONS + 10];
        let result = InferenceResult::new(Utc::now(), detections, ClassFilter::all(), None);
        assert_eq!(result.detections.len(), MAX_DETECTIONS);
    }

    #[test]
    fn test_class_name_resolution() {
        let table: ClassTable = [(2, "car".to_string())].into_iter().collect();
        let result = InferenceResult::new(
            Utc::now(),
            vec![
                Detection::new(0, "person", 0.9, BoundingBox::default()),
                Detection::new(2, "", 0.9, BoundingBox::default()),
                Detection::new(7, "", 0.9, BoundingBox::default()),
            ],
            ClassFilter::all(),
            Some(Arc::new(table)),
        );

        assert_eq!(result.class_name(&result.detections[0]), "person");
        assert_eq!(result.class_name(&result.detections[1]), "car");
        assert_eq!(result.class_name(&result.detections[2]), UNKNOWN_CLASS_NAME);
    }

    #[test]
    fn test_selected_detections_skip_invalid() {
        let bbox = BoundingBox::default();
        let result = InferenceResult::new(
            Utc::now(),
            vec![
                Detection::new(0, "person", 0.9, bbox),
                Detection::new(0, "person", 0.0, bbox),
                Detection::new(-1, "ghost", 0.9, bbox),
                Detection::new(3, "motorcycle", 0.6, bbox),
            ],
            ClassFilter::from_ids([0]),
            None,
        );

        assert_eq!(result.valid_detections().count(), 2);
        assert_eq!(result.selected_detections().count(), 1);
    }
}
