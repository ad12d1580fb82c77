//! Endpoint metrics for observability
//!
//! `EndpointMetrics` holds the per-endpoint counters behind
//! `HttpEndpoint::stats`. Process-wide counters and histograms go through
//! the `metrics` facade and are no-ops until a recorder is installed.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use ::metrics::{counter, histogram};
use contracts::{EndpointStats, Outcome};

/// Metrics for a single endpoint
#[derive(Debug, Default)]
pub struct EndpointMetrics {
    /// Current inbound queue length
    queue_len: AtomicUsize,
    /// Records accepted by producers
    records_accepted: AtomicU64,
    /// Records dropped due to full queue
    records_dropped: AtomicU64,
    /// Records included in delivered batches
    records_sent: AtomicU64,
    /// Batches that produced an outcome
    batches_sent: AtomicU64,
    /// Batches lost to delivery failures
    batch_failures: AtomicU64,
    /// Outcomes dropped due to full response queue
    outcomes_dropped: AtomicU64,
    /// Last send duration
    last_send_micros: AtomicU64,
}

impl EndpointMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get accepted record count
    pub fn records_accepted(&self) -> u64 {
        self.records_accepted.load(Ordering::Relaxed)
    }

    /// Increment accepted record count
    pub fn inc_records_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get dropped record count
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    /// Increment dropped record count
    pub fn inc_records_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered batch count
    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// Record a delivered batch of `records` records
    pub fn record_batch_sent(&self, records: usize, elapsed: Duration) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.records_sent.fetch_add(records as u64, Ordering::Relaxed);
        self.set_last_send(elapsed);
    }

    /// Get failed batch count
    pub fn batch_failures(&self) -> u64 {
        self.batch_failures.load(Ordering::Relaxed)
    }

    /// Record a failed batch
    pub fn record_batch_failure(&self, elapsed: Duration) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
        self.set_last_send(elapsed);
    }

    /// Get dropped outcome count
    pub fn outcomes_dropped(&self) -> u64 {
        self.outcomes_dropped.load(Ordering::Relaxed)
    }

    /// Increment dropped outcome count
    pub fn inc_outcomes_dropped(&self) {
        self.outcomes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn set_last_send(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_send_micros.store(micros, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> EndpointStats {
        EndpointStats {
            queue_len: self.queue_len(),
            records_accepted: self.records_accepted(),
            records_dropped: self.records_dropped(),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            batches_sent: self.batches_sent(),
            batch_failures: self.batch_failures(),
            outcomes_dropped: self.outcomes_dropped(),
            last_send_micros: self.last_send_micros.load(Ordering::Relaxed),
        }
    }
}

/// Facade metrics for a batch that produced an outcome
pub(crate) fn emit_batch_sent(
    endpoint: &str,
    records: usize,
    outcome: &Outcome,
    elapsed: Duration,
) {
    counter!(
        "metrics_sink_batches_sent_total",
        "endpoint" => endpoint.to_string(),
        "status_class" => outcome.status_class()
    )
    .increment(1);
    counter!("metrics_sink_records_sent_total", "endpoint" => endpoint.to_string())
        .increment(records as u64);
    histogram!("metrics_sink_batch_size", "endpoint" => endpoint.to_string())
        .record(records as f64);
    histogram!("metrics_sink_send_latency_ms", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Facade metrics for a batch lost to a delivery failure
pub(crate) fn emit_batch_failed(endpoint: &str, records: usize) {
    counter!("metrics_sink_batches_failed_total", "endpoint" => endpoint.to_string())
        .increment(1);
    counter!("metrics_sink_records_lost_total", "endpoint" => endpoint.to_string())
        .increment(records as u64);
}
