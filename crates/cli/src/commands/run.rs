//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut service = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(capacity) = args.inbox_capacity {
        if capacity == 0 {
            anyhow::bail!("--inbox-capacity must be greater than 0");
        }
        info!(capacity, "Overriding inbox capacity from CLI");
        service.inbox_capacity = capacity;
    }

    info!(
        inbox_capacity = service.inbox_capacity,
        exporters = service.exporters.len(),
        ttl_secs = ?service.store.ttl_secs,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&service);
        return Ok(());
    }

    let input = open_input(args).await?;

    let pipeline = Pipeline::new(PipelineConfig {
        service,
        drain_timeout: Duration::from_secs(args.drain_timeout),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(input, setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        results_dispatched = stats.results_dispatched,
        invalid_lines = stats.invalid_lines,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Pipeline completed successfully"
    );

    stats.print_summary();

    info!("Healthcheck dispatch finished");
    Ok(())
}

async fn open_input(args: &RunArgs) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, CliError> {
    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CliError::input_open(path.display().to_string(), e))?;
            info!(input = %path.display(), "Reading check outcomes from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading check outcomes from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(service: &contracts::ServiceConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Inbox capacity: {}", service.inbox_capacity);

    println!("\nStore:");
    match service.store.ttl_secs {
        Some(ttl) => println!(
            "  TTL: {}s (purged every {}s)",
            ttl, service.store.purge_interval_secs
        ),
        None => println!("  TTL: none"),
    }
    println!("  Max entries: {}", service.store.max_entries);

    if !service.exporters.is_empty() {
        println!("\nExporters ({}):", service.exporters.len());
        for exporter in &service.exporters {
            println!("  - {} ({:?})", exporter.name, exporter.exporter_type);
        }
    }

    println!();
}
