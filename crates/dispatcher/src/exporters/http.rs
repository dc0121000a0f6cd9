//! HttpExporter - POSTs results as JSON

use async_trait::async_trait;
use contracts::{ContractError, Exporter, HealthcheckResult};
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Configuration for HttpExporter
#[derive(Debug, Clone)]
pub struct HttpExporterConfig {
    /// Target endpoint
    pub url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpExporterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let url_str = params
            .get("url")
            .ok_or_else(|| "missing 'url' parameter".to_string())?;

        let url = Url::parse(url_str).map_err(|e| format!("invalid url '{}': {}", url_str, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported url scheme '{}'", url.scheme()));
        }

        let timeout_ms = match params.get("timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("invalid timeout_ms '{}': {}", raw, e))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            url,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Exporter that sends every result to an HTTP endpoint
///
/// The body is a JSON array holding the single result.
pub struct HttpExporter {
    name: String,
    config: HttpExporterConfig,
    client: Option<Client>,
}

impl HttpExporter {
    pub fn new(name: impl Into<String>, config: HttpExporterConfig) -> Self {
        Self {
            name: name.into(),
            config,
            client: None,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = HttpExporterConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("exporters[{}].params", name), e))?;
        Ok(Self::new(name, config))
    }

    fn client(&self) -> Result<&Client, ContractError> {
        self.client
            .as_ref()
            .ok_or_else(|| ContractError::exporter_not_started(&self.name))
    }
}

#[async_trait]
impl Exporter for HttpExporter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "http_exporter_start", skip(self), fields(url = %self.config.url))]
    async fn start(&mut self) -> Result<(), ContractError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| ContractError::exporter_connection(&self.name, e.to_string()))?;
        self.client = Some(client);

        debug!(exporter = %self.name, target = %self.config.url, "HttpExporter ready");
        Ok(())
    }

    #[instrument(name = "http_exporter_stop", skip(self))]
    async fn stop(&mut self) -> Result<(), ContractError> {
        self.client = None;
        debug!(exporter = %self.name, "HttpExporter stopped");
        Ok(())
    }

    #[instrument(
        name = "http_exporter_push",
        skip(self, result),
        fields(exporter = %self.name, check = %result.name)
    )]
    async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
        let response = self
            .client()?
            .post(self.config.url.clone())
            .json(&[result])
            .send()
            .await
            .map_err(|e| ContractError::exporter_push(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContractError::exporter_push(
                &self.name,
                format!("endpoint returned {}", status),
            ));
        }

        debug!(exporter = %self.name, status = %status, "Pushed");
        Ok(())
    }
}
