//! Layered error definitions
//!
//! Categorized by source: config / exporter / store

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

    // ===== Exporter Errors =====
    /// Exporter push error
    #[error("exporter '{exporter}' push error: {message}")]
    ExporterPush { exporter: String, message: String },

    /// Exporter connection / lifecycle error
    #[error("exporter '{exporter}' connection error: {message}")]
    ExporterConnection { exporter: String, message: String },

    /// Exporter used before `start` or after `stop`
    #[error("exporter '{exporter}' is not started")]
    ExporterNotStarted { exporter: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
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

    /// Create exporter push error
    pub fn exporter_push(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExporterPush {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    /// Create exporter connection error
    pub fn exporter_connection(exporter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExporterConnection {
            exporter: exporter.into(),
            message: message.into(),
        }
    }

    pub fn exporter_not_started(exporter: impl Into<String>) -> Self {
        Self::ExporterNotStarted {
            exporter: exporter.into(),
        }
    }
}
