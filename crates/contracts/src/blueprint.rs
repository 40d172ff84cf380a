//! PipelineBlueprint - Config Loader output
//!
//! Describes the full distribution setup: class selection and the list of
//! publishers, each binding one formatter to one transport at its own rate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::ClassNameMapping;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Class filter configuration
    #[serde(default)]
    pub classes: ClassesConfig,

    /// Publisher definitions
    #[validate(length(min = 1, message = "at least one publisher is required"))]
    #[validate(nested)]
    pub publishers: Vec<PublisherConfig>,
}

/// Class filter configuration
///
/// `selected` is a comma-separated list of class names resolved through the
/// labels file. Class id 0 is always added to the resolved filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassesConfig {
    /// Labels file, one class name per line (line index = class id)
    #[serde(default)]
    pub labels_path: Option<PathBuf>,

    /// Comma-separated class names
    #[serde(default)]
    pub selected: Option<String>,
}

/// Publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublisherConfig {
    /// Unique publisher name
    #[validate(length(min = 1, message = "publisher name cannot be empty"))]
    pub name: String,

    /// Output rate (messages per second), must be > 0
    #[serde(default = "default_rate_hz")]
    #[validate(range(exclusive_min = 0.0, message = "rate_hz must be > 0"))]
    pub rate_hz: f64,

    /// Wire format
    pub formatter: FormatterConfig,

    /// Delivery target
    pub transport: TransportConfig,
}

fn default_rate_hz() -> f64 {
    1.0
}

/// Formatter selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Formatter variant
    pub kind: FormatterKind,

    /// Return empty output (skip the send) when nothing was detected
    ///
    /// Honored by `full_json`.
    #[serde(default)]
    pub suppress_empty: bool,

    /// Class rename table (selective variants)
    #[serde(default)]
    pub class_mapping: ClassNameMapping,
}

impl FormatterConfig {
    pub fn new(kind: FormatterKind) -> Self {
        Self {
            kind,
            suppress_empty: false,
            class_mapping: ClassNameMapping::default(),
        }
    }
}

/// Formatter variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatterKind {
    /// Per-class counts as JSON
    Json,
    /// `detection_count:n!!timestamp:t`
    BrightScriptVariable,
    /// Person count as faces_* JSON
    FacesJson,
    /// Person count as faces_* BrightScript variables
    FacesBs,
    /// Per-class counts for selected classes as JSON, with renames
    SelectiveJson,
    /// Per-class counts for selected classes as BrightScript variables, with renames
    SelectiveBs,
    /// Every selected detection with box and score
    FullJson,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Atomically replaced snapshot file
    File {
        /// Target file path
        path: PathBuf,
    },
    /// Fire-and-forget UDP datagrams
    Udp {
        /// Target host (IP address or resolvable name)
        host: String,
        /// Target port
        port: u16,
        /// Payloads above this size are logged as oversized
        #[serde(default = "default_max_datagram_size")]
        max_datagram_size: usize,
    },
}

fn default_max_datagram_size() -> usize {
    65000
}

impl TransportConfig {
    /// File transport writing to `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// UDP transport sending to `host:port`
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self::Udp {
            host: host.into(),
            port,
            max_datagram_size: default_max_datagram_size(),
        }
    }

    /// Short type tag for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Udp { .. } => "udp",
        }
    }

    /// Human-readable target
    pub fn target(&self) -> String {
        match self {
            Self::File { path } => path.display().to_string(),
            Self::Udp { host, port, .. } => format!("{host}:{port}"),
        }
    }
}

impl PipelineBlueprint {
    /// Built-in wiring used when no config file is given
    ///
    /// A 1 Hz JSON snapshot file plus selective JSON and BrightScript feeds
    /// over UDP to the local display client.
    pub fn default_wiring() -> Self {
        Self {
            version: ConfigVersion::V1,
            classes: ClassesConfig::default(),
            publishers: vec![
                PublisherConfig {
                    name: "snapshot_file".into(),
                    rate_hz: 1.0,
                    formatter: FormatterConfig::new(FormatterKind::Json),
                    transport: TransportConfig::file("/tmp/results.json"),
                },
                PublisherConfig {
                    name: "udp_selective_json".into(),
                    rate_hz: 1.0,
                    formatter: FormatterConfig::new(FormatterKind::SelectiveJson),
                    transport: TransportConfig::udp("127.0.0.1", 5002),
                },
                PublisherConfig {
                    name: "udp_selective_bs".into(),
                    rate_hz: 1.0,
                    formatter: FormatterConfig::new(FormatterKind::SelectiveBs),
                    transport: TransportConfig::udp("127.0.0.1", 5000),
                },
            ],
        }
    }

    /// Apply the suppress-empty flag to every publisher
    pub fn set_suppress_empty(&mut self, suppress: bool) {
        for publisher in &mut self.publishers {
            publisher.formatter.suppress_empty = suppress;
        }
    }
}
