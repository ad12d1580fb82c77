//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metrics Sink - deliver serialized metric records to a collector
#[derive(Parser, Debug)]
#[command(
    name = "metrics-sink",
    author,
    version,
    about = "Deliver metric records to files, sockets or a batching HTTP collector",
    long_about = "Reads already-serialized metric records, one per line, and writes them to \n\
                  the transport selected by the endpoint URL scheme (file, udp, tcp, librato).\n\n\
                  The librato transport batches records into {\"gauges\": [...]} envelopes \n\
                  and prints every collector response it receives."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "METRICS_SINK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "METRICS_SINK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send records to an endpoint
    Send(SendArgs),

    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display configured endpoints
    Info(InfoArgs),
}

/// Where the `send` command delivers records
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Endpoint URL (e.g. librato://metrics-api.librato.com/v1/metrics)
    #[arg(long, env = "METRICS_SINK_URL")]
    pub url: Option<String>,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "METRICS_SINK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub target: Target,

    /// Endpoint name in the configuration file (defaults to the first one)
    #[arg(short, long, requires = "config")]
    pub endpoint: Option<String>,

    /// Read records from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Maximum time in milliseconds to wait for delivery after input ends
    #[arg(long, default_value = "5000", env = "METRICS_SINK_WAIT_MS")]
    pub wait_ms: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "METRICS_SINK_METRICS_PORT")]
    pub metrics_port: u16,

    /// Wait for queue space instead of dropping records when the queue is full
    #[arg(long)]
    pub block: bool,

    /// Print a delivery summary when done
    #[arg(long)]
    pub summary: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sink.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "sink.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_with_url() {
        let cli = Cli::try_parse_from(["metrics-sink", "send", "--url", "udp://127.0.0.1:8125"])
            .unwrap();
        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.target.url.as_deref(), Some("udp://127.0.0.1:8125"));
        assert_eq!(args.wait_ms, 5000);
    }

    #[test]
    fn test_send_requires_a_target() {
        assert!(Cli::try_parse_from(["metrics-sink", "send"]).is_err());
    }

    #[test]
    fn test_send_url_conflicts_with_config() {
        let result = Cli::try_parse_from([
            "metrics-sink",
            "send",
            "--url",
            "udp://127.0.0.1:8125",
            "--config",
            "sink.toml",
        ]);
        assert!(result.is_err());
    }
}
