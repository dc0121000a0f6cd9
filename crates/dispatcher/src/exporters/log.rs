//! LogExporter - logs result summary via tracing

use async_trait::async_trait;
use contracts::{ContractError, Exporter, HealthcheckResult};
use tracing::{info, instrument};

/// Exporter that logs result summaries
pub struct LogExporter {
    name: String,
}

impl LogExporter {
    /// Create a new LogExporter with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_result_summary(&self, result: &HealthcheckResult) {
        info!(
            exporter = %self.name,
            name = %result.name,
            success = result.success,
            message = %result.message,
            duration = result.duration,
            labels = result.labels.len(),
            timestamp = result.timestamp,
            "HealthcheckResult exported"
        );
    }
}

#[async_trait]
impl Exporter for LogExporter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_exporter_start", skip(self))]
    async fn start(&mut self) -> Result<(), ContractError> {
        // Nothing to acquire for log exporter
        Ok(())
    }

    #[instrument(name = "log_exporter_stop", skip(self))]
    async fn stop(&mut self) -> Result<(), ContractError> {
        info!(exporter = %self.name, "LogExporter stopped");
        Ok(())
    }

    #[instrument(
        name = "log_exporter_push",
        skip(self, result),
        fields(exporter = %self.name, check = %result.name)
    )]
    async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
        self.log_result_summary(result);
        Ok(())
    }
}
