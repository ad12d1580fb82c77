//! MetricsEndpoint trait - read/write contract shared by every transport

use crate::SinkError;

/// Bidirectional metrics endpoint
///
/// `write` submits one record, `read` consumes one delivery response.
/// Transports without a response path report end-of-stream (`Ok(0)`).
#[trait_variant::make(MetricsEndpoint: Send)]
pub trait LocalMetricsEndpoint {
    /// Endpoint name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Submit one record
    ///
    /// Returns the number of bytes accepted.
    ///
    /// # Errors
    /// `QueueFull` when a batching transport rejects the record, `Closed`
    /// after shutdown, `Io` for stream transports.
    async fn write(&mut self, record: &[u8]) -> Result<usize, SinkError>;

    /// Read the next response into `buf`
    ///
    /// # Errors
    /// `ResponseTruncated` when `buf` is shorter than the response; the
    /// prefix that fits has been copied.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SinkError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Close endpoint
    async fn close(&mut self) -> Result<(), SinkError>;
}
