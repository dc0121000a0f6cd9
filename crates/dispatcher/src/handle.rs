//! ExporterHandle - an exporter plus its delivery metrics

use std::sync::Arc;

use contracts::{ContractError, Exporter, HealthcheckResult};
use tracing::{debug, instrument};

use crate::metrics::ExporterMetrics;

/// Handle owning one registered exporter
///
/// Pushes go through [`ExporterHandle::push`], which never fails: delivery
/// errors are counted and dropped.
pub struct ExporterHandle {
    /// Exporter name
    name: String,
    /// The exporter itself
    exporter: Box<dyn Exporter>,
    /// Shared metrics
    metrics: Arc<ExporterMetrics>,
}

impl ExporterHandle {
    pub fn new(exporter: Box<dyn Exporter>) -> Self {
        Self {
            name: exporter.name().to_string(),
            exporter,
            metrics: Arc::new(ExporterMetrics::new()),
        }
    }

    /// Get exporter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ExporterMetrics> {
        &self.metrics
    }

    #[instrument(name = "exporter_handle_start", skip(self), fields(exporter = %self.name))]
    pub async fn start(&mut self) -> Result<(), ContractError> {
        self.exporter.start().await
    }

    /// Deliver one result
    ///
    /// Returns true on success. Failures are only visible through metrics.
    pub async fn push(&mut self, result: &HealthcheckResult) -> bool {
        let delivered = self.exporter.push(result).await.is_ok();
        if delivered {
            self.metrics.inc_push_count();
        } else {
            self.metrics.inc_failure_count();
        }
        observability::record_exporter_push(&self.name, delivered);
        delivered
    }

    #[instrument(name = "exporter_handle_stop", skip(self), fields(exporter = %self.name))]
    pub async fn stop(&mut self) -> Result<(), ContractError> {
        self.exporter.stop().await?;
        debug!(exporter = %self.name, "Exporter stopped");
        Ok(())
    }
}
