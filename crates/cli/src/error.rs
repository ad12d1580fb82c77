//! Error types for CLI operations.

use contracts::SinkError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Named endpoint missing from the configuration
    #[error("Endpoint '{name}' not found in {path}")]
    EndpointNotFound { name: String, path: String },

    /// Configuration defines no endpoints
    #[error("No endpoints configured in {path}")]
    NoEndpoints { path: String },

    /// Transport or configuration error
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn endpoint_not_found(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn no_endpoints(path: impl Into<String>) -> Self {
        Self::NoEndpoints { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
