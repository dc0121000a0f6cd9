//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Exporter creation error
    #[error("failed to create exporter '{name}': {message}")]
    ExporterCreation { name: String, message: String },

    /// Exporter start error
    #[error("failed to start exporter '{name}': {source}")]
    ExporterStart {
        name: String,
        #[source]
        source: ContractError,
    },

    /// Exporter stop error; exporters after this one were not stopped
    #[error("failed to stop exporter '{name}': {source}")]
    ExporterStop {
        name: String,
        #[source]
        source: ContractError,
    },

    /// Drain loop task panicked or was aborted
    #[error("dispatcher worker failed: {message}")]
    WorkerPanicked { message: String },
}

impl DispatcherError {
    /// Create an exporter creation error
    pub fn exporter_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExporterCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn exporter_start(name: impl Into<String>, source: ContractError) -> Self {
        Self::ExporterStart {
            name: name.into(),
            source,
        }
    }

    pub fn exporter_stop(name: impl Into<String>, source: ContractError) -> Self {
        Self::ExporterStop {
            name: name.into(),
            source,
        }
    }
}
