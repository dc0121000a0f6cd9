//! Exporter metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single exporter
#[derive(Debug, Default)]
pub struct ExporterMetrics {
    /// Total successful pushes
    push_count: AtomicU64,
    /// Total push failures (swallowed by the dispatcher)
    failure_count: AtomicU64,
}

impl ExporterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_count(&self) -> u64 {
        self.push_count.load(Ordering::Relaxed)
    }

    pub fn inc_push_count(&self) {
        self.push_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Total push attempts
    pub fn attempts(&self) -> u64 {
        self.push_count() + self.failure_count()
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            push_count: self.push_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of exporter metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub push_count: u64,
    pub failure_count: u64,
}
