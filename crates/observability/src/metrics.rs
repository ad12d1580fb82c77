//! 投递指标收集模块
//!
//! 导出 endpoint 的丢弃计数与计数快照，并在内存中聚合 outcome 统计。
//! batch 级别的 counter/histogram 由 transport 的 dispatch loop 直接上报。

use std::collections::BTreeMap;

use contracts::{EndpointStats, Outcome};
use metrics::{counter, gauge};

/// 记录入队被拒绝的 record
pub fn record_record_dropped(endpoint: &str) {
    counter!(
        "metrics_sink_records_dropped_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// 以 gauge 形式导出 endpoint 计数快照
pub fn record_endpoint_stats(endpoint: &str, stats: &EndpointStats) {
    let name = endpoint.to_string();
    gauge!("metrics_sink_queue_len", "endpoint" => name.clone()).set(stats.queue_len as f64);
    gauge!("metrics_sink_records_accepted", "endpoint" => name.clone())
        .set(stats.records_accepted as f64);
    gauge!("metrics_sink_records_dropped", "endpoint" => name.clone())
        .set(stats.records_dropped as f64);
    gauge!("metrics_sink_batch_failures", "endpoint" => name.clone())
        .set(stats.batch_failures as f64);
    gauge!("metrics_sink_outcomes_dropped", "endpoint" => name.clone())
        .set(stats.outcomes_dropped as f64);
    gauge!("metrics_sink_last_send_ms", "endpoint" => name)
        .set(stats.last_send_micros as f64 / 1000.0);
}

/// 投递指标聚合器
///
/// 在内存中聚合 outcome 统计，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    /// 收到的 outcome 总数
    pub total_outcomes: u64,

    /// 2xx outcome 数
    pub successful: u64,

    /// 各状态码分类计数
    pub status_counts: BTreeMap<&'static str, u64>,

    /// 最近一次非 2xx 的状态行
    pub last_error: Option<String>,
}

impl DeliveryStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个 outcome
    pub fn observe_outcome(&mut self, outcome: &Outcome) {
        let class = outcome.status_class();
        self.total_outcomes += 1;
        if class == "2xx" {
            self.successful += 1;
        } else {
            self.last_error = Some(outcome.status.clone());
        }
        *self.status_counts.entry(class).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            total_outcomes: self.total_outcomes,
            success_rate: if self.total_outcomes > 0 {
                self.successful as f64 / self.total_outcomes as f64 * 100.0
            } else {
                0.0
            },
            status_counts: self.status_counts.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 投递摘要
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_outcomes: u64,
    pub success_rate: f64,
    pub status_counts: BTreeMap<&'static str, u64>,
    pub last_error: Option<String>,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(
            f,
            "Outcomes: {} ({:.2}% success)",
            self.total_outcomes, self.success_rate
        )?;
        if let Some(ref status) = self.last_error {
            writeln!(f, "Last error status: {}", status)?;
        }

        if !self.status_counts.is_empty() {
            writeln!(f, "Status classes:")?;
            for (class, count) in &self.status_counts {
                writeln!(f, "  {}: {}", class, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_counts_outcomes() {
        let mut aggregator = DeliveryStatsAggregator::new();
        aggregator.observe_outcome(&Outcome::new("200 OK", "{}"));
        aggregator.observe_outcome(&Outcome::new("202 Accepted", ""));
        aggregator.observe_outcome(&Outcome::new("400 Bad Request", "bad gauge"));

        assert_eq!(aggregator.total_outcomes, 3);
        assert_eq!(aggregator.successful, 2);
        assert_eq!(aggregator.status_counts.get("2xx"), Some(&2));
        assert_eq!(aggregator.status_counts.get("4xx"), Some(&1));

        let summary = aggregator.summary();
        assert!((summary.success_rate - 66.666).abs() < 0.01);
        assert_eq!(summary.last_error.as_deref(), Some("400 Bad Request"));

        aggregator.reset();
        assert_eq!(aggregator.total_outcomes, 0);
        assert!(aggregator.last_error.is_none());
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryStatsAggregator::new();
        aggregator.observe_outcome(&Outcome::new("200 OK", "{}"));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Outcomes: 1"));
        assert!(output.contains("100.00%"));
        assert!(output.contains("2xx: 1"));
        assert!(!output.contains("Last error"));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // The facade is a no-op until a recorder is installed
        record_record_dropped("librato");
        record_endpoint_stats("librato", &EndpointStats::default());
    }
}
