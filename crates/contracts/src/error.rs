//! Layered error definitions
//!
//! Categorized by source: config / class labels / transport

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Class Label Errors =====
    /// Label file could not be used
    #[error("class labels error for '{path}': {message}")]
    ClassLabels { path: String, message: String },

    // ===== Transport Errors =====
    /// Transport send error
    #[error("transport '{transport}' send error: {message}")]
    TransportSend { transport: String, message: String },

    /// Transport is disabled or has no usable socket
    #[error("transport '{transport}' not connected")]
    TransportDisconnected { transport: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create class labels error
    pub fn class_labels(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClassLabels {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create transport send error
    pub fn transport_send(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportSend {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create transport disconnected error
    pub fn transport_disconnected(transport: impl Into<String>) -> Self {
        Self::TransportDisconnected {
            transport: transport.into(),
        }
    }
}
