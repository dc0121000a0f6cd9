//! 健康检查结果指标收集模块
//!
//! 基于 HealthcheckResult 收集和统计分发管道的运行指标。

use std::collections::HashMap;

use contracts::HealthcheckResult;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 注册分发指标的描述信息
pub fn describe_metrics() {
    describe_counter!(
        "hc_dispatch_results_total",
        "Results consumed by the dispatcher, by check name and status"
    );
    describe_histogram!(
        "hc_dispatch_check_duration_seconds",
        Unit::Seconds,
        "Reported healthcheck duration"
    );
    describe_gauge!(
        "hc_dispatch_last_result_timestamp",
        Unit::Seconds,
        "Timestamp of the latest result per check"
    );
    describe_counter!(
        "hc_dispatch_exporter_pushes_total",
        "Exporter push attempts, by exporter and status"
    );
    describe_gauge!("hc_dispatch_inbox_depth", "Results waiting in the inbox");
    describe_gauge!("hc_dispatch_stored_results", "Distinct healthchecks held by the store");
}

/// 记录一次结果处理
///
/// Dispatcher 每消费一个结果调用一次。
pub fn record_result_processed(result: &HealthcheckResult) {
    let status = if result.success { "success" } else { "failure" };
    counter!(
        "hc_dispatch_results_total",
        "name" => result.name.clone(),
        "status" => status
    )
    .increment(1);

    histogram!("hc_dispatch_check_duration_seconds", "name" => result.name.clone())
        .record(result.duration);

    gauge!("hc_dispatch_last_result_timestamp", "name" => result.name.clone())
        .set(result.timestamp as f64);
}

/// 记录 exporter 推送结果
pub fn record_exporter_push(exporter: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hc_dispatch_exporter_pushes_total",
        "exporter" => exporter.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录 inbox 积压深度
pub fn record_inbox_depth(depth: usize) {
    gauge!("hc_dispatch_inbox_depth").set(depth as f64);
}

/// 记录内存存储中的结果数
pub fn record_stored_results(count: usize) {
    gauge!("hc_dispatch_stored_results").set(count as f64);
}

/// 结果统计聚合器
///
/// 在内存中聚合指标，便于输出运行摘要。
#[derive(Debug, Clone, Default)]
pub struct ResultStatsAggregator {
    /// 总结果数
    pub total_results: u64,

    /// 成功数
    pub successes: u64,

    /// 失败数
    pub failures: u64,

    /// 检查耗时统计 (毫秒)
    pub duration_stats: RunningStats,

    /// 各检查失败次数
    pub failure_counts: HashMap<String, u64>,
}

impl ResultStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, result: &HealthcheckResult) {
        self.total_results += 1;

        if result.success {
            self.successes += 1;
        } else {
            self.failures += 1;
            *self.failure_counts.entry(result.name.clone()).or_insert(0) += 1;
        }

        self.duration_stats.push(result.duration * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            total_results: self.total_results,
            successes: self.successes,
            failures: self.failures,
            failure_rate: if self.total_results > 0 {
                self.failures as f64 / self.total_results as f64 * 100.0
            } else {
                0.0
            },
            duration_ms: StatsSummary::from(&self.duration_stats),
            failure_counts: self.failure_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 结果摘要
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub total_results: u64,
    pub successes: u64,
    pub failures: u64,
    pub failure_rate: f64,
    pub duration_ms: StatsSummary,
    pub failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Healthcheck Results Summary ===")?;
        writeln!(f, "Total results: {}", self.total_results)?;
        writeln!(f, "Successes: {}", self.successes)?;
        writeln!(
            f,
            "Failures: {} ({:.2}%)",
            self.failures, self.failure_rate
        )?;
        writeln!(f, "Check duration (ms): {}", self.duration_ms)?;

        if !self.failure_counts.is_empty() {
            let mut counts: Vec<_> = self.failure_counts.iter().collect();
            counts.sort();
            writeln!(f, "Failures per check:")?;
            for (name, count) in counts {
                writeln!(f, "  {}: {}", name, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, success: bool, duration: f64) -> HealthcheckResult {
        HealthcheckResult {
            name: name.to_string(),
            summary: None,
            labels: HashMap::new(),
            success,
            timestamp: 1_700_000_000,
            message: if success { "success".into() } else { "timeout".into() },
            duration,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = ResultStatsAggregator::new();
        aggregator.update(&result("disk", true, 0.01));
        aggregator.update(&result("dns", false, 0.5));
        aggregator.update(&result("dns", false, 0.3));

        assert_eq!(aggregator.total_results, 3);
        assert_eq!(aggregator.successes, 1);
        assert_eq!(aggregator.failures, 2);
        assert_eq!(aggregator.failure_counts.get("dns"), Some(&2));

        let summary = aggregator.summary();
        assert!((summary.failure_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.duration_ms.count, 3);

        aggregator.reset();
        assert_eq!(aggregator.total_results, 0);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = ResultStatsAggregator::new();
        aggregator.update(&result("disk", true, 0.01));
        aggregator.update(&result("dns", false, 0.02));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total results: 2"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("dns: 1"));
    }
}
