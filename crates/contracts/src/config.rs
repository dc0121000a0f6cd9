//! ServiceConfig - Config Loader output
//!
//! Describes the full dispatch setup: inbox sizing, store retention, exporter routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Inbox (producer -> dispatcher) capacity
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Memory store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Exporter routing, in fan-out order
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

fn default_inbox_capacity() -> usize {
    100
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            inbox_capacity: default_inbox_capacity(),
            store: StoreConfig::default(),
            exporters: Vec::new(),
        }
    }
}

/// Memory store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Results older than this are purged (None = keep forever)
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Purge task period
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Maximum number of distinct healthchecks retained
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_purge_interval_secs() -> u64 {
    30
}

fn default_max_entries() -> usize {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            purge_interval_secs: default_purge_interval_secs(),
            max_entries: default_max_entries(),
        }
    }
}

/// Exporter output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Exporter name
    pub name: String,

    /// Exporter type
    pub exporter_type: ExporterType,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Exporter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExporterType {
    /// Tracing output
    Log,
    /// JSON lines file
    File,
    /// HTTP POST
    Http,
}
