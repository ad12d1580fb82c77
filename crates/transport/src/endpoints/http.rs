//! HttpEndpoint - batching transport for a remote metrics collector

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};
use url::Url;

use contracts::{
    BatchingConfig, EndpointConfig, EndpointStats, MetricsEndpoint, Outcome, OverflowPolicy,
    SinkError,
};

use crate::batcher::{BatchPolicy, DispatchLoop};
use crate::metrics::EndpointMetrics;
use crate::retry::{RetryPolicy, RetryingSender};
use crate::sender::{BatchSender, HttpSender};

/// Cloneable producer handle for an `HttpEndpoint`
///
/// Any number of tasks may submit through clones of the same writer.
#[derive(Clone)]
pub struct RecordWriter {
    name: Arc<str>,
    tx: mpsc::Sender<Bytes>,
    policy: OverflowPolicy,
    capacity: usize,
    metrics: Arc<EndpointMetrics>,
}

impl RecordWriter {
    /// Submit one record to the inbound queue
    ///
    /// Under `DropNewest` a full queue rejects the record with `QueueFull`
    /// without waiting; under `Block` the call waits for space.
    pub async fn submit(&self, record: impl Into<Bytes>) -> Result<usize, SinkError> {
        let record = record.into();
        let len = record.len();

        match self.policy {
            OverflowPolicy::DropNewest => match self.tx.try_send(record) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.metrics.inc_records_dropped();
                    warn!(endpoint = %self.name, bytes = len, "Queue full, record dropped");
                    return Err(SinkError::QueueFull {
                        endpoint: self.name.to_string(),
                        capacity: self.capacity,
                    });
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(SinkError::closed(self.name.as_ref()));
                }
            },
            OverflowPolicy::Block => {
                self.tx
                    .send(record)
                    .await
                    .map_err(|_| SinkError::closed(self.name.as_ref()))?;
            }
        }

        self.metrics.inc_records_accepted();
        self.metrics.set_queue_len(self.capacity - self.tx.capacity());
        Ok(len)
    }

    /// Endpoint name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Endpoint that batches records and POSTs them to a collector
///
/// Owns the dispatch loop task. Delivery outcomes are read back with
/// `read` or `read_outcome`.
pub struct HttpEndpoint {
    name: String,
    writer: RecordWriter,
    responses: mpsc::Receiver<Outcome>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    metrics: Arc<EndpointMetrics>,
}

impl HttpEndpoint {
    /// Build the HTTP sender for `url` and start the dispatch loop
    ///
    /// Wraps the sender in the retry layer when `config.retry` enables it.
    #[instrument(name = "http_endpoint_connect", skip(config), fields(endpoint = %config.name))]
    pub fn connect(url: Url, config: &EndpointConfig) -> Result<Self, SinkError> {
        let sender = HttpSender::new(url, &config.http)?;
        let endpoint = if config.retry.is_enabled() {
            let retrying = RetryingSender::new(sender, RetryPolicy::from(&config.retry));
            Self::spawn(&config.name, retrying, &config.batching)
        } else {
            Self::spawn(&config.name, sender, &config.batching)
        };
        Ok(endpoint)
    }

    /// Start a dispatch loop around an arbitrary batch sender
    pub fn spawn<S>(name: impl Into<String>, sender: S, batching: &BatchingConfig) -> Self
    where
        S: BatchSender + Sync + 'static,
    {
        let name = name.into();
        let capacity = batching.queue_capacity.max(1);
        let (records_tx, records_rx) = mpsc::channel(capacity);
        let (responses_tx, responses_rx) = mpsc::channel(batching.response_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::new(EndpointMetrics::new());

        let dispatch = DispatchLoop::new(
            name.clone(),
            sender,
            records_rx,
            responses_tx,
            shutdown_rx,
            BatchPolicy::from(batching),
            Arc::clone(&metrics),
        );
        let worker = tokio::spawn(dispatch.run());

        debug!(
            endpoint = %name,
            queue_capacity = capacity,
            inbound_policy = ?batching.inbound_policy,
            "HttpEndpoint started"
        );

        let writer = RecordWriter {
            name: Arc::from(name.as_str()),
            tx: records_tx,
            policy: batching.inbound_policy,
            capacity,
            metrics: Arc::clone(&metrics),
        };

        Self {
            name,
            writer,
            responses: responses_rx,
            shutdown: shutdown_tx,
            worker: Some(worker),
            metrics,
        }
    }

    /// Producer handle that can be cloned across tasks
    pub fn writer(&self) -> RecordWriter {
        self.writer.clone()
    }

    /// Current counters
    pub fn stats(&self) -> EndpointStats {
        self.metrics.snapshot()
    }

    /// Wait for the next outcome; `None` once the endpoint is closed and drained
    pub async fn read_outcome(&mut self) -> Option<Outcome> {
        self.responses.recv().await
    }

    /// Take an outcome if one is ready
    pub fn try_read_outcome(&mut self) -> Option<Outcome> {
        self.responses.try_recv().ok()
    }

    /// Signal shutdown and wait for the loop to flush and exit
    #[instrument(name = "http_endpoint_shutdown", skip(self), fields(endpoint = %self.name))]
    async fn shutdown(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!(endpoint = %self.name, error = ?e, "Dispatch loop panicked");
            }
        }
        debug!(endpoint = %self.name, "HttpEndpoint shutdown complete");
    }
}

impl Drop for HttpEndpoint {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl MetricsEndpoint for HttpEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_endpoint_write",
        skip(self, record),
        fields(endpoint = %self.name, bytes = record.len())
    )]
    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError> {
        self.writer.submit(Bytes::copy_from_slice(record)).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SinkError> {
        let Some(outcome) = self.responses.recv().await else {
            return Ok(0);
        };

        let payload = outcome.to_bytes();
        let copied = payload.len().min(buf.len());
        buf[..copied].copy_from_slice(&payload[..copied]);

        if copied < payload.len() {
            return Err(SinkError::ResponseTruncated {
                copied,
                total: payload.len(),
            });
        }
        Ok(copied)
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        // Batches are flushed by the dispatch loop's ticker
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.shutdown().await;
        Ok(())
    }
}
