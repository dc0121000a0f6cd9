//! FileExporter - appends results to a JSON lines file

use async_trait::async_trait;
use contracts::{ContractError, Exporter, HealthcheckResult};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileExporter
#[derive(Debug, Clone)]
pub struct FileExporterConfig {
    /// Output file, created if missing and appended to otherwise
    pub path: PathBuf,
}

impl FileExporterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        Ok(Self { path })
    }
}

/// Exporter that writes one JSON document per line
pub struct FileExporter {
    name: String,
    config: FileExporterConfig,
    writer: Option<BufWriter<File>>,
}

impl FileExporter {
    pub fn new(name: impl Into<String>, config: FileExporterConfig) -> Self {
        Self {
            name: name.into(),
            config,
            writer: None,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileExporterConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("exporters[{}].params", name), e))?;
        Ok(Self::new(name, config))
    }

    fn open(&self) -> std::io::Result<BufWriter<File>> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.path)?;
        Ok(BufWriter::new(file))
    }

    fn write_line(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ContractError::exporter_not_started(&self.name))?;

        serde_json::to_writer(&mut *writer, result)
            .map_err(|e| ContractError::exporter_push(&self.name, e.to_string()))?;
        writer.write_all(b"\n").map_err(|e| {
            error!(exporter = %self.name, error = %e, "Write failed");
            ContractError::exporter_push(&self.name, e.to_string())
        })
    }
}

#[async_trait]
impl Exporter for FileExporter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_exporter_start", skip(self), fields(path = %self.config.path.display()))]
    async fn start(&mut self) -> Result<(), ContractError> {
        if self.writer.is_none() {
            let writer = self
                .open()
                .map_err(|e| ContractError::exporter_connection(&self.name, e.to_string()))?;
            self.writer = Some(writer);
        }
        debug!(exporter = %self.name, "FileExporter opened");
        Ok(())
    }

    #[instrument(name = "file_exporter_stop", skip(self))]
    async fn stop(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        debug!(exporter = %self.name, "FileExporter closed");
        Ok(())
    }

    #[instrument(
        name = "file_exporter_push",
        skip(self, result),
        fields(exporter = %self.name, check = %result.name)
    )]
    async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
        self.write_line(result)
    }
}
