//! Class label loading and class-selection resolution
//!
//! Labels file: one class name per non-blank line, the line index among
//! non-blank lines being the class id (COCO `coco_80_labels_list.txt` layout).

use std::collections::HashMap;
use std::path::Path;

use contracts::{ClassFilter, ClassSelection, ClassTable, ClassesConfig, ContractError};
use tracing::{debug, info, warn};

/// Class name <-> id table loaded from a labels file
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    names: Vec<String>,
    ids: HashMap<String, i32>,
}

impl ClassLabels {
    /// Load labels from a file
    ///
    /// # Errors
    /// - File read failure
    /// - File contains no labels
    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ContractError::class_labels(path.display().to_string(), e.to_string()))?;

        let labels = Self::parse(&content);
        if labels.is_empty() {
            return Err(ContractError::class_labels(
                path.display().to_string(),
                "no class labels found",
            ));
        }

        debug!(path = %path.display(), classes = labels.len(), "class labels loaded");
        Ok(labels)
    }

    /// Parse labels from file content
    pub fn parse(content: &str) -> Self {
        let mut labels = Self::default();
        for line in content.lines() {
            let name = line.trim_end();
            if name.is_empty() {
                continue;
            }
            let id = labels.names.len() as i32;
            labels.ids.insert(name.to_string(), id);
            labels.names.push(name.to_string());
        }
        labels
    }

    /// Class id for a label
    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.ids.get(name).copied()
    }

    /// Label for a class id
    pub fn name_of(&self, class_id: i32) -> Option<&str> {
        usize::try_from(class_id)
            .ok()
            .and_then(|idx| self.names.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Id -> name table carried by each result
    pub fn class_table(&self) -> ClassTable {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as i32, name.clone()))
            .collect()
    }
}

/// Resolve comma-separated class names to ids
///
/// Surrounding whitespace is ignored; unknown names are logged and skipped.
/// An empty string yields no ids.
pub fn parse_class_selection(selection: &str, labels: &ClassLabels) -> Vec<i32> {
    let mut ids = Vec::new();
    for name in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match labels.id_of(name) {
            Some(id) => {
                info!(class = name, id, "class selected");
                ids.push(id);
            }
            None => warn!(class = name, "unknown class name, ignoring"),
        }
    }
    ids
}

/// Build the pipeline's class selection from configuration
///
/// `base_dir` resolves a relative `labels_path` (usually the config file's
/// directory). Class id 0 is always part of the resolved filter.
pub fn resolve_class_selection(
    config: &ClassesConfig,
    base_dir: Option<&Path>,
) -> Result<ClassSelection, ContractError> {
    let labels = match &config.labels_path {
        Some(path) => {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            };
            Some(ClassLabels::load(&path)?)
        }
        None => None,
    };

    let selection = config.selected.as_deref().unwrap_or("").trim();
    let ids = match (&labels, selection.is_empty()) {
        (Some(labels), false) => {
            let ids = parse_class_selection(selection, labels);
            if ids.is_empty() {
                warn!(selection, "no valid classes in selection, publishing class 0 only");
            }
            ids
        }
        (None, false) => {
            return Err(ContractError::config_validation(
                "classes.selected",
                "class selection requires classes.labels_path",
            ));
        }
        (_, true) => Vec::new(),
    };

    let filter = ClassFilter::from_ids(ids).with_primary();
    Ok(ClassSelection::new(
        filter,
        labels.as_ref().map(ClassLabels::class_table),
    ))
}
