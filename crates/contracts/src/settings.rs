//! SinkSettings - Config Loader output
//!
//! Describes every configured endpoint: destination URL, batching, HTTP and retry tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete sink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkSettings {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Endpoint definitions
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl SinkSettings {
    /// Look up an endpoint by name
    pub fn endpoint(&self, name: &str) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

/// One metrics destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint name
    pub name: String,

    /// Destination URL; the scheme selects the transport
    pub url: String,

    /// Queueing and batching (HTTP collector only)
    #[serde(default)]
    pub batching: BatchingConfig,

    /// HTTP request settings (HTTP collector only)
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry layer settings (HTTP collector only)
    #[serde(default)]
    pub retry: RetryConfig,
}

impl EndpointConfig {
    /// Endpoint config with default tuning
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            batching: BatchingConfig::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// What to do when a bounded queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until space frees
    Block,
    /// Reject the new item
    #[default]
    DropNewest,
}

/// Inbound/outbound queue sizing and batch flushing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Inbound record queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Hard upper bound on records per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Flush ticker period in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Outbound response queue capacity
    #[serde(default = "default_response_capacity")]
    pub response_capacity: usize,

    /// Policy when the inbound queue is full
    #[serde(default)]
    pub inbound_policy: OverflowPolicy,

    /// Policy when the response queue is full
    #[serde(default = "default_response_policy")]
    pub response_policy: OverflowPolicy,
}

impl BatchingConfig {
    /// Flush ticker period
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_batch_size: default_max_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            response_capacity: default_response_capacity(),
            inbound_policy: OverflowPolicy::default(),
            response_policy: default_response_policy(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_max_batch_size() -> usize {
    300
}

fn default_flush_interval_ms() -> u64 {
    100
}

fn default_response_capacity() -> usize {
    1000
}

fn default_response_policy() -> OverflowPolicy {
    OverflowPolicy::Block
}

/// HTTP request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Name of the list in the JSON envelope (`{"gauges": [...]}`)
    #[serde(default = "default_envelope_key")]
    pub envelope_key: String,
}

impl HttpConfig {
    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            envelope_key: default_envelope_key(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_envelope_key() -> String {
    "gauges".to_string()
}

/// Retry-with-backoff settings; `max_retries = 0` disables the layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first failure
    #[serde(default)]
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Whether the retry layer should wrap the sender
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batching_defaults() {
        let config = BatchingConfig::default();
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.max_batch_size, 300);
        assert_eq!(config.flush_interval(), Duration::from_millis(100));
        assert_eq!(config.response_capacity, 1000);
        assert_eq!(config.inbound_policy, OverflowPolicy::DropNewest);
        assert_eq!(config.response_policy, OverflowPolicy::Block);
    }

    #[test]
    fn test_endpoint_defaults_from_json() {
        let json = r#"{ "name": "librato", "url": "librato://metrics.example.com/v1" }"#;
        let config: EndpointConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.http.envelope_key, "gauges");
        assert_eq!(config.http.request_timeout(), Duration::from_secs(30));
        assert!(!config.retry.is_enabled());
    }

    #[test]
    fn test_overflow_policy_snake_case() {
        let policy: OverflowPolicy = serde_json::from_str("\"drop_newest\"").unwrap();
        assert_eq!(policy, OverflowPolicy::DropNewest);
        let policy: OverflowPolicy = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(policy, OverflowPolicy::Block);
    }

    #[test]
    fn test_settings_lookup() {
        let settings = SinkSettings {
            version: ConfigVersion::V1,
            endpoints: vec![EndpointConfig::new("a", "file:///tmp/a.log")],
        };
        assert!(settings.endpoint("a").is_some());
        assert!(settings.endpoint("b").is_none());
    }
}
