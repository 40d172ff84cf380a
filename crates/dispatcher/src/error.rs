//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Transport creation error
    #[error("failed to create transport for '{name}': {message}")]
    TransportCreation { name: String, message: String },

    /// Publisher rate is zero, negative or not finite
    #[error("publisher '{name}' has invalid rate {rate_hz}: must be > 0")]
    InvalidRate { name: String, rate_hz: f64 },

    /// Two publishers share a name
    #[error("duplicate publisher name '{name}'")]
    DuplicatePublisher { name: String },
}

impl DispatcherError {
    /// Create a transport creation error
    pub fn transport_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid rate error
    pub fn invalid_rate(name: impl Into<String>, rate_hz: f64) -> Self {
        Self::InvalidRate {
            name: name.into(),
            rate_hz,
        }
    }
}
