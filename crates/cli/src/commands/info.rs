//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::ServiceConfig;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    inbox_capacity: usize,
    store: StoreInfo,
    exporters: Vec<ExporterInfo>,
}

#[derive(Serialize)]
struct StoreInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_secs: Option<u64>,
    purge_interval_secs: u64,
    max_entries: usize,
}

#[derive(Serialize)]
struct ExporterInfo {
    name: String,
    exporter_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let service = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&service, args.params);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&service, args.params);
    }

    Ok(())
}

fn build_config_info(service: &ServiceConfig, with_params: bool) -> ConfigInfo {
    let exporters = service
        .exporters
        .iter()
        .map(|e| ExporterInfo {
            name: e.name.clone(),
            exporter_type: format!("{:?}", e.exporter_type),
            params: if with_params {
                e.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", service.version),
        inbox_capacity: service.inbox_capacity,
        store: StoreInfo {
            ttl_secs: service.store.ttl_secs,
            purge_interval_secs: service.store.purge_interval_secs,
            max_entries: service.store.max_entries,
        },
        exporters,
    }
}

fn print_config_info(service: &ServiceConfig, with_params: bool) {
    println!("=== Healthcheck Dispatch Configuration ===\n");

    println!("Service");
    println!("  |- Version: {:?}", service.version);
    println!("  `- Inbox capacity: {}", service.inbox_capacity);

    let store = &service.store;
    println!("\nStore");
    match store.ttl_secs {
        Some(ttl) => {
            println!("  |- TTL: {}s", ttl);
            println!("  |- Purge interval: {}s", store.purge_interval_secs);
        }
        None => println!("  |- TTL: none"),
    }
    println!("  `- Max entries: {}", store.max_entries);

    println!("\nExporters ({})", service.exporters.len());
    for (i, exporter) in service.exporters.iter().enumerate() {
        let is_last = i == service.exporters.len() - 1;
        let prefix = if is_last { "`-" } else { "|-" };
        let child_prefix = if is_last { "   " } else { "|  " };

        println!("  {} {} ({:?})", prefix, exporter.name, exporter.exporter_type);

        if with_params {
            let mut params: Vec<_> = exporter.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("  {}   {} = {}", child_prefix, key, value);
            }
        }
    }

    println!();
}
