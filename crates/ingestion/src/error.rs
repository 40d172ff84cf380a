//! Ingestion error types

use std::time::Duration;

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Replay file could not be read
    #[error("failed to read replay file '{path}': {message}")]
    ReplayRead {
        /// Replay file path
        path: String,
        /// Error message
        message: String,
    },

    /// A replay line is not a valid detection set
    #[error("invalid detection set at {path}:{line}: {message}")]
    ReplayParse {
        path: String,
        /// 1-based line number
        line: usize,
        message: String,
    },

    /// Replay file holds no detection sets
    #[error("replay file '{path}' contains no detection sets")]
    EmptyReplay { path: String },

    /// Emission rate is zero, negative or not finite
    #[error("source {source_id} has invalid fps {fps}")]
    InvalidRate { source_id: String, fps: f64 },
}

impl IngestionError {
    pub fn invalid_rate(source_id: impl Into<String>, fps: f64) -> Self {
        Self::InvalidRate {
            source_id: source_id.into(),
            fps,
        }
    }
}

/// Delay between two emitted sets at `fps`
///
/// Rejects rates whose period is not representable as a `Duration`.
pub(crate) fn emission_interval(source_id: &str, fps: f64) -> Result<Duration> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(IngestionError::invalid_rate(source_id, fps));
    }
    Duration::try_from_secs_f64(1.0 / fps).map_err(|_| IngestionError::invalid_rate(source_id, fps))
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
