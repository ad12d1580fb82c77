//! RetryingSender - bounded retry with exponential backoff around any sender

use std::time::Duration;

use bytes::Bytes;
use tracing::{error, warn};

use contracts::{Outcome, RetryConfig, SinkError};

use crate::sender::BatchSender;

/// Backoff schedule for the retry layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// First delay
    pub initial_delay: Duration,
    /// Delay cap
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), doubling up to the cap
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Sender wrapper that retries network failures inline
///
/// Retries run inside the caller's `send_batch`, so a dispatch loop still
/// has at most one batch in flight.
#[derive(Debug, Clone)]
pub struct RetryingSender<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingSender<S> {
    /// Wrap `inner` with `policy`
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Wrapped sender
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: BatchSender + Sync> BatchSender for RetryingSender<S> {
    async fn send_batch(&self, batch: &[Bytes]) -> Result<Outcome, SinkError> {
        let mut retry = 0;
        loop {
            match self.inner.send_batch(batch).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    retry += 1;
                    let delay = self.policy.delay_for(retry);
                    warn!(
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        records = batch.len(),
                        error = %e,
                        "Send failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if retry > 0 {
                        error!(retries = retry, error = %e, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}
