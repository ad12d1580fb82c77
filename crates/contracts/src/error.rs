//! Layered error definitions
//!
//! Categorized by source: config / dispatch / queue / delivery / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum SinkError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Dispatch Errors =====
    /// URL could not be parsed or lacks a required component
    #[error("invalid url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Scheme is recognized but has no transport
    #[error("scheme '{scheme}' is not implemented")]
    UnsupportedScheme { scheme: String },

    /// Scheme is not recognized at all
    #[error("unknown scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    // ===== Queue Errors =====
    /// Inbound queue at capacity, record rejected
    #[error("queue full for endpoint '{endpoint}' (capacity {capacity}), record dropped")]
    QueueFull { endpoint: String, capacity: usize },

    /// Consumer buffer smaller than the outcome; `copied` bytes were written
    #[error("response truncated: copied {copied} of {total} bytes")]
    ResponseTruncated { copied: usize, total: usize },

    /// Endpoint has been shut down
    #[error("endpoint '{endpoint}' is closed")]
    Closed { endpoint: String },

    // ===== Delivery Errors =====
    /// Could not reach the collector (connect, timeout, reset)
    #[error("network failure posting to {url}: {message}")]
    NetworkFailure { url: String, message: String },

    /// Response arrived but its body could not be read
    #[error("failed to read response body from {url}: {message}")]
    BodyReadFailure { url: String, message: String },

    /// HTTP client could not be constructed
    #[error("http client error: {0}")]
    Client(String),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid url error
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create network failure error
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create body read failure error
    pub fn body_read(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BodyReadFailure {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create closed error
    pub fn closed(endpoint: impl Into<String>) -> Self {
        Self::Closed {
            endpoint: endpoint.into(),
        }
    }

    /// Whether a retry layer may attempt the batch again.
    ///
    /// Only transport failures qualify; a body read failure means the
    /// collector already accepted the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. })
    }
}
