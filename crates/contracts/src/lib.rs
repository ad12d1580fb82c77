//! # Contracts
//!
//! Shared interface contracts for the metrics sink workspace.
//! Transport, configuration and observability crates depend only on this crate.
//!
//! ## Data Model
//! - A `Record` is one already-serialized metric sample (opaque bytes)
//! - An `Outcome` is the status line and body returned by a remote collector
//! - Every transport implements the `MetricsEndpoint` read/write contract

mod endpoint;
mod error;
mod record;
mod scheme;
mod settings;
mod stats;

pub use endpoint::*;
pub use error::*;
pub use record::*;
pub use scheme::Scheme;
pub use settings::*;
pub use stats::EndpointStats;
