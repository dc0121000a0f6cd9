//! Pipeline statistics and metrics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::ResultStatsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines read
    pub lines_read: u64,

    /// Lines that were not valid check outcomes
    pub invalid_lines: u64,

    /// Results handed to the dispatcher inbox
    pub results_enqueued: u64,

    /// Results fully dispatched before shutdown
    pub results_dispatched: u64,

    /// Distinct healthchecks held by the store at shutdown
    pub stored_results: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of exporters registered
    pub active_exporters: usize,

    /// Per-exporter delivery metrics
    pub exporter_metrics: Vec<(String, MetricsSnapshot)>,

    /// Result statistics aggregator
    pub result_stats: ResultStatsAggregator,
}

impl PipelineStats {
    /// Results dispatched per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.results_dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Results enqueued but never dispatched
    pub fn dropped(&self) -> u64 {
        self.results_enqueued.saturating_sub(self.results_dispatched)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Lines read: {}", self.lines_read);
        println!("  Invalid lines: {}", self.invalid_lines);
        println!("  Results enqueued: {}", self.results_enqueued);
        println!("  Results dispatched: {}", self.results_dispatched);
        println!("  Dropped at shutdown: {}", self.dropped());
        println!("  Throughput: {:.2}/s", self.throughput());
        println!("  Stored healthchecks: {}", self.stored_results);
        println!("  Active exporters: {}", self.active_exporters);

        if !self.exporter_metrics.is_empty() {
            println!("\nExporters");
            for (name, snapshot) in &self.exporter_metrics {
                println!(
                    "  {}: {} pushed, {} failed",
                    name, snapshot.push_count, snapshot.failure_count
                );
            }
        }

        println!("\n{}", self.result_stats.summary());
    }
}
