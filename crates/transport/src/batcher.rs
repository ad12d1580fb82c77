//! Dispatch loop - drains submitted records into batches and ships them
//!
//! One loop runs per HTTP endpoint. It waits on whichever comes first:
//! a new record, the flush ticker, or shutdown. A batch is sent when the
//! ticker fires with pending records or when the batch reaches its size
//! bound. Sends are awaited inline, so at most one batch is in flight.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, instrument, warn};

use contracts::{BatchingConfig, Outcome, OverflowPolicy};

use crate::metrics::{emit_batch_failed, emit_batch_sent, EndpointMetrics};
use crate::sender::BatchSender;

/// Shortest flush period the loop accepts; a zero period cannot tick
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Batching parameters for one dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Hard upper bound on records per batch
    pub max_batch_size: usize,
    /// Flush ticker period
    pub flush_interval: Duration,
    /// Policy when the response queue is full
    pub response_policy: OverflowPolicy,
}

impl From<&BatchingConfig> for BatchPolicy {
    fn from(config: &BatchingConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size.max(1),
            flush_interval: config.flush_interval().max(MIN_FLUSH_INTERVAL),
            response_policy: config.response_policy,
        }
    }
}

/// Background batching task owned by an HTTP endpoint
pub(crate) struct DispatchLoop<S> {
    name: String,
    sender: S,
    records: mpsc::Receiver<Bytes>,
    responses: mpsc::Sender<Outcome>,
    shutdown: watch::Receiver<bool>,
    policy: BatchPolicy,
    metrics: Arc<EndpointMetrics>,
    stopping: bool,
}

impl<S: BatchSender + Sync> DispatchLoop<S> {
    pub(crate) fn new(
        name: String,
        sender: S,
        records: mpsc::Receiver<Bytes>,
        responses: mpsc::Sender<Outcome>,
        shutdown: watch::Receiver<bool>,
        policy: BatchPolicy,
        metrics: Arc<EndpointMetrics>,
    ) -> Self {
        Self {
            name,
            sender,
            records,
            responses,
            shutdown,
            policy,
            metrics,
            stopping: false,
        }
    }

    /// Run until shutdown is signalled or every producer is gone
    #[instrument(name = "dispatch_loop", skip(self), fields(endpoint = %self.name))]
    pub(crate) async fn run(mut self) {
        debug!(
            max_batch_size = self.policy.max_batch_size,
            flush_interval_ms = self.policy.flush_interval.as_millis() as u64,
            "Dispatch loop started"
        );

        let period = self.policy.flush_interval.max(MIN_FLUSH_INTERVAL);
        let mut batch: Vec<Bytes> = Vec::with_capacity(self.policy.max_batch_size);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stopping {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        self.stopping = true;
                    }
                }
                maybe_record = self.records.recv() => match maybe_record {
                    Some(record) => {
                        self.metrics.set_queue_len(self.records.len());
                        batch.push(record);
                        if batch.len() >= self.policy.max_batch_size {
                            self.dispatch(&mut batch).await;
                        }
                    }
                    None => self.stopping = true,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.dispatch(&mut batch).await;
                    }
                }
            }
        }

        self.drain(batch).await;
        debug!("Dispatch loop stopped");
    }

    /// Send whatever is already queued, then stop accepting records
    async fn drain(&mut self, mut batch: Vec<Bytes>) {
        self.records.close();
        while let Ok(record) = self.records.try_recv() {
            batch.push(record);
            if batch.len() >= self.policy.max_batch_size {
                self.dispatch(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            self.dispatch(&mut batch).await;
        }
        self.metrics.set_queue_len(0);
    }

    /// Ship one batch; failures are logged and the batch is discarded
    async fn dispatch(&mut self, batch: &mut Vec<Bytes>) {
        let records =
            std::mem::replace(batch, Vec::with_capacity(self.policy.max_batch_size));
        let started = Instant::now();

        match self.sender.send_batch(&records).await {
            Ok(outcome) => {
                let elapsed = started.elapsed();
                self.metrics.record_batch_sent(records.len(), elapsed);
                emit_batch_sent(&self.name, records.len(), &outcome, elapsed);
                debug!(
                    records = records.len(),
                    status = %outcome.status,
                    "Batch sent"
                );
                self.deliver(outcome).await;
            }
            Err(e) => {
                self.metrics.record_batch_failure(started.elapsed());
                emit_batch_failed(&self.name, records.len());
                error!(
                    records = records.len(),
                    error = %e,
                    "Batch delivery failed, batch dropped"
                );
            }
        }
    }

    /// Push an outcome to readers according to the response policy
    async fn deliver(&mut self, outcome: Outcome) {
        // Nobody is guaranteed to read once shutdown started.
        let policy = if self.stopping {
            OverflowPolicy::DropNewest
        } else {
            self.policy.response_policy
        };

        match policy {
            OverflowPolicy::DropNewest => match self.responses.try_send(outcome) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    self.metrics.inc_outcomes_dropped();
                    warn!(status = %dropped.status, "Response queue full, outcome dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Response reader gone, outcome discarded");
                }
            },
            OverflowPolicy::Block => {
                tokio::select! {
                    biased;

                    sent = self.responses.send(outcome) => {
                        if sent.is_err() {
                            debug!("Response reader gone, outcome discarded");
                        }
                    }
                    _ = self.shutdown.changed() => {
                        self.metrics.inc_outcomes_dropped();
                        warn!("Shutdown while response queue full, outcome dropped");
                        self.stopping = true;
                    }
                }
            }
        }
    }
}
