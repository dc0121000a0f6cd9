//! Exporter trait - Dispatcher output interface
//!
//! Defines the abstract interface for result sinks.

use async_trait::async_trait;

use crate::{ContractError, HealthcheckResult};

/// Result output trait
///
/// All exporter implementations must implement this trait. The dispatcher
/// holds exporters as `Box<dyn Exporter>`, so the trait stays object-safe.
#[async_trait]
pub trait Exporter: Send {
    /// Exporter name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Acquire whatever the exporter needs to push (clients, files, ...)
    async fn start(&mut self) -> Result<(), ContractError>;

    /// Release exporter resources
    async fn stop(&mut self) -> Result<(), ContractError>;

    /// Deliver one result
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError>;
}
