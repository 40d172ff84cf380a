//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use observability::LogFormat;
use std::path::PathBuf;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

/// Detection Relay - distributes detection results to file and UDP sinks
#[derive(Parser, Debug)]
#[command(
    name = "detection-relay",
    author,
    version,
    about = "Detection result distribution pipeline",
    long_about = "Distributes periodic detection results to independent sinks.\n\n\
                  Each publisher binds one wire format to one transport (snapshot file \n\
                  or UDP datagram) and runs at its own rate, always sending the latest result."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DETECTION_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "DETECTION_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the distribution pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in wiring when absent
    #[arg(short, long, env = "DETECTION_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Detection source
    #[arg(long, value_enum, default_value = "mock", env = "DETECTION_RELAY_SOURCE")]
    pub source: SourceKind,

    /// JSON-lines file of recorded detection sets (replay source)
    #[arg(long, required_if_eq("source", "replay"), env = "DETECTION_RELAY_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Loop the replay file
    #[arg(long)]
    pub replay_loop: bool,

    /// Detection sets produced per second
    #[arg(long, default_value = "10", env = "DETECTION_RELAY_FPS")]
    pub fps: f64,

    /// RNG seed for the mock source
    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma-separated class names to publish (overrides classes.selected)
    #[arg(long, env = "DETECTION_RELAY_CLASSES")]
    pub classes: Option<String>,

    /// Class labels file (overrides classes.labels_path)
    #[arg(long, env = "DETECTION_RELAY_LABELS")]
    pub labels: Option<PathBuf>,

    /// Skip sending when there is nothing to report
    #[arg(long)]
    pub suppress_empty: bool,

    /// Maximum number of results to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "DETECTION_RELAY_MAX_RESULTS")]
    pub max_results: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "DETECTION_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Channel buffer size between source and dispatcher
    #[arg(long, default_value = "16", env = "DETECTION_RELAY_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DETECTION_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Detection source kind
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// Synthetic random detections
    #[default]
    Mock,
    /// Recorded detection sets
    Replay,
}
