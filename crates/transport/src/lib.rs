//! # Transport
//!
//! Metrics delivery transports.
//!
//! Responsibilities:
//! - Select a transport from the endpoint URL scheme
//! - File, UDP and TCP passthrough endpoints
//! - Batching HTTP endpoint: bounded inbound queue, single dispatch loop,
//!   `{"gauges": [...]}` envelope, outcomes on a bounded response queue
//! - Optional retry layer around the batch sender
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::MetricsEndpoint;
//! use transport::open_url;
//!
//! let mut endpoint = open_url("librato", "librato://metrics-api.librato.com/v1/metrics").await?;
//! endpoint.write(br#"{"name":"cpu","value":0.42}"#).await?;
//!
//! let mut buf = [0u8; 4096];
//! let n = endpoint.read(&mut buf).await?;
//! println!("{}", String::from_utf8_lossy(&buf[..n]));
//! endpoint.close().await?;
//! ```

pub mod batcher;
pub mod endpoints;
pub mod metrics;
pub mod mock;
pub mod open;
pub mod retry;
pub mod sender;

pub use batcher::BatchPolicy;
pub use contracts::{MetricsEndpoint, Outcome, SinkError};
pub use endpoints::{FileEndpoint, HttpEndpoint, RecordWriter, TcpEndpoint, UdpEndpoint};
pub use crate::metrics::EndpointMetrics;
pub use open::{normalize_collector_url, open, open_url, parse_endpoint_url, Endpoint};
pub use retry::{RetryPolicy, RetryingSender};
pub use sender::{status_line, BatchSender, Envelope, HttpSender};
