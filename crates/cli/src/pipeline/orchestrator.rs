//! Pipeline orchestrator - wires input, store and dispatcher together.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{HealthcheckResult, ResultStore, ServiceConfig};
use dispatcher::{create_dispatcher, Dispatcher};
use memory_store::MemoryStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{CheckOutcome, PipelineStats};
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded service configuration
    pub service: ServiceConfig,

    /// How long to wait for queued results after end of input
    pub drain_timeout: Duration,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Relay outcomes from `input` until end of input or `shutdown` resolves
    ///
    /// On end of input, queued results get `drain_timeout` to be dispatched.
    /// On shutdown, whatever is still queued is dropped.
    pub async fn run<R, S>(self, input: R, shutdown: S) -> Result<PipelineStats>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let service = &self.config.service;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let store = Arc::new(MemoryStore::new(service.store.clone()));
        let (inbox_tx, inbox_rx) = mpsc::channel::<HealthcheckResult>(service.inbox_capacity);

        if service.exporters.is_empty() {
            warn!("No exporters configured - results are only stored");
        }

        let store_handle: Arc<dyn ResultStore> = store.clone();
        let mut dispatcher =
            create_dispatcher(service.exporters.clone(), store_handle, inbox_rx).await?;
        dispatcher.start();

        info!(
            exporters = dispatcher.exporter_count(),
            inbox_capacity = service.inbox_capacity,
            "Dispatcher started"
        );

        let mut stats = PipelineStats {
            active_exporters: dispatcher.exporter_count(),
            ..Default::default()
        };

        let relayed = relay(input, shutdown, &inbox_tx, &mut stats).await;
        drop(inbox_tx);

        // Drain unless interrupted
        if !matches!(relayed, Ok(true)) {
            wait_for_drain(&dispatcher, stats.results_enqueued, self.config.drain_timeout).await;
        }

        info!("Shutting down pipeline...");
        let stopped = dispatcher.stop().await;
        store.stop().await;

        stats.results_dispatched = dispatcher.processed_count();
        stats.exporter_metrics = dispatcher.metrics();
        stats.stored_results = store.len();
        stats.duration = start_time.elapsed();
        observability::record_stored_results(stats.stored_results);

        relayed?;
        stopped.map_err(CliError::shutdown)?;

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            dispatched = stats.results_dispatched,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Feed the inbox; returns true when interrupted before end of input
///
/// Lines that are not UTF-8 or not a check outcome are counted and skipped.
async fn relay<R, S>(
    mut input: R,
    shutdown: S,
    inbox: &mpsc::Sender<HealthcheckResult>,
    stats: &mut PipelineStats,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut buf = Vec::new();
    tokio::pin!(shutdown);

    loop {
        buf.clear();

        tokio::select! {
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping pipeline...");
                return Ok(true);
            }
            read = input.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    info!(lines = stats.lines_read, "End of input");
                    return Ok(false);
                }
                stats.lines_read += 1;

                let line = match std::str::from_utf8(&buf) {
                    Ok(line) => line.trim(),
                    Err(e) => {
                        stats.invalid_lines += 1;
                        warn!(line = stats.lines_read, error = %e, "Skipping non UTF-8 input line");
                        continue;
                    }
                };
                if line.is_empty() {
                    continue;
                }

                let outcome = match CheckOutcome::parse(line) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        stats.invalid_lines += 1;
                        warn!(line = stats.lines_read, error = %e, "Skipping invalid check outcome");
                        continue;
                    }
                };

                let result = outcome.into_result();
                stats.result_stats.update(&result);

                if inbox.send(result).await.is_err() {
                    warn!("Dispatcher inbox closed");
                    return Ok(true);
                }
                stats.results_enqueued += 1;
            }
        }
    }
}

async fn wait_for_drain(dispatcher: &Dispatcher, expected: u64, timeout: Duration) {
    let drained = tokio::time::timeout(timeout, async {
        while dispatcher.processed_count() < expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            expected,
            processed = dispatcher.processed_count(),
            "Drain timeout reached, queued results will be dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ExporterConfig, ExporterType};
    use std::collections::HashMap;
    use tempfile::tempdir;

    const INPUT: &str = r#"{"name":"disk","labels":{"env":"prod"},"duration":0.01}
not json

{"name":"dns","duration":2.0,"error":"timeout"}
{"name":"disk","labels":{"env":"prod"},"duration":0.02}
"#;

    fn config(service: ServiceConfig) -> PipelineConfig {
        PipelineConfig {
            service,
            drain_timeout: Duration::from_secs(5),
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_pipeline_relays_to_file_exporter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        let service = ServiceConfig {
            exporters: vec![
                ExporterConfig {
                    name: "console".into(),
                    exporter_type: ExporterType::Log,
                    params: HashMap::new(),
                },
                ExporterConfig {
                    name: "archive".into(),
                    exporter_type: ExporterType::File,
                    params: HashMap::from([(
                        "path".to_string(),
                        path.display().to_string(),
                    )]),
                },
            ],
            ..Default::default()
        };

        let stats = Pipeline::new(config(service))
            .run(INPUT.as_bytes(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.lines_read, 5);
        assert_eq!(stats.invalid_lines, 1);
        assert_eq!(stats.results_enqueued, 3);
        assert_eq!(stats.results_dispatched, 3);
        assert_eq!(stats.dropped(), 0);
        assert_eq!(stats.stored_results, 2);
        assert_eq!(stats.active_exporters, 2);
        assert_eq!(stats.result_stats.failures, 1);
        for (_, snapshot) in &stats.exporter_metrics {
            assert_eq!(snapshot.push_count, 3);
        }

        let written: Vec<HealthcheckResult> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let names: Vec<_> = written.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["disk", "dns", "disk"]);
        assert_eq!(written[1].message, "timeout");
    }

    #[tokio::test]
    async fn test_pipeline_skips_non_utf8_line() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"name\":\"disk\",\"duration\":0.01}\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"name\":\"dns\",\"duration\":0.02}\n");

        let stats = Pipeline::new(config(ServiceConfig::default()))
            .run(input.as_slice(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.invalid_lines, 1);
        assert_eq!(stats.results_enqueued, 2);
        assert_eq!(stats.results_dispatched, 2);
        assert_eq!(stats.stored_results, 2);
    }

    #[tokio::test]
    async fn test_pipeline_stops_on_shutdown() {
        let (_input_tx, input_rx) = tokio::io::duplex(64);
        let input = tokio::io::BufReader::new(input_rx);

        let stats = Pipeline::new(config(ServiceConfig::default()))
            .run(input, sleep(Duration::from_millis(20)))
            .await
            .unwrap();

        assert_eq!(stats.results_enqueued, 0);
        assert_eq!(stats.active_exporters, 0);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_bad_exporter() {
        let service = ServiceConfig {
            exporters: vec![ExporterConfig {
                name: "central".into(),
                exporter_type: ExporterType::Http,
                params: HashMap::new(),
            }],
            ..Default::default()
        };

        let err = Pipeline::new(config(service))
            .run("".as_bytes(), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Dispatcher(_)));
    }
}
