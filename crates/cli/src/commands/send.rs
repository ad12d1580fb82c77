//! `send` command implementation.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use contracts::{EndpointConfig, MetricsEndpoint, Outcome, OverflowPolicy, SinkError};
use observability::DeliveryStatsAggregator;
use transport::Endpoint;

use crate::cli::SendArgs;
use crate::error::CliError;

/// Counters for one `send` run
#[derive(Debug, Default)]
struct SendStats {
    lines_read: u64,
    records_written: u64,
    records_dropped: u64,
    outcomes: DeliveryStatsAggregator,
}

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let mut config = resolve_endpoint(args)?;
    if args.block {
        config.batching.inbound_policy = OverflowPolicy::Block;
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    info!(endpoint = %config.name, url = %config.url, "Opening endpoint");
    let mut endpoint = transport::open(&config)
        .await
        .with_context(|| format!("Failed to open endpoint '{}'", config.name))?;

    let input = open_input(args.input.as_deref()).await?;
    let started = Instant::now();
    let mut stats = SendStats::default();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = &mut shutdown => {
                warn!("Received shutdown signal, closing endpoint...");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        stats.lines_read += 1;

        let record = frame_record(&endpoint, line);
        match endpoint.write(&record).await {
            Ok(_) => stats.records_written += 1,
            Err(SinkError::QueueFull { .. }) => {
                stats.records_dropped += 1;
                observability::record_record_dropped(&config.name);
            }
            Err(e) => return Err(e).context("Failed to write record"),
        }

        // Keep the response queue from filling up while input is still flowing
        drain_ready_outcomes(&mut endpoint, &mut stats)?;
    }

    let wait = Duration::from_millis(args.wait_ms);
    match tokio::time::timeout(wait, finish(&mut endpoint, &mut stats)).await {
        Ok(result) => result?,
        Err(_) => warn!(wait_ms = args.wait_ms, "Timed out waiting for delivery"),
    }

    if let Some(http) = endpoint.as_http() {
        observability::record_endpoint_stats(&config.name, &http.stats());
    }

    info!(
        endpoint = %config.name,
        lines = stats.lines_read,
        written = stats.records_written,
        dropped = stats.records_dropped,
        outcomes = stats.outcomes.total_outcomes,
        duration_secs = started.elapsed().as_secs_f64(),
        "Send completed"
    );

    if args.summary {
        print_summary(&endpoint, &stats);
    }

    Ok(())
}

/// Endpoint settings from `--url` or from the configuration file
fn resolve_endpoint(args: &SendArgs) -> crate::error::Result<EndpointConfig> {
    if let Some(ref url) = args.target.url {
        return Ok(EndpointConfig::new("cli", url.as_str()));
    }

    let Some(ref path) = args.target.config else {
        // clap guarantees one of the two
        return Err(CliError::config_not_found("<none>"));
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    let settings = config_loader::ConfigLoader::load_from_path(path)?;
    let config = match args.endpoint {
        Some(ref name) => settings
            .endpoint(name)
            .ok_or_else(|| CliError::endpoint_not_found(name, path.display().to_string()))?,
        None => settings
            .endpoints
            .first()
            .ok_or_else(|| CliError::no_endpoints(path.display().to_string()))?,
    };
    Ok(config.clone())
}

/// Socket and file transports get one record per line; the collector gets raw records
fn frame_record(endpoint: &Endpoint, line: String) -> Vec<u8> {
    let mut record = line.into_bytes();
    if endpoint.as_http().is_none() {
        record.push(b'\n');
    }
    record
}

/// Records come from `--input` or stdin, one per line
async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

fn drain_ready_outcomes(endpoint: &mut Endpoint, stats: &mut SendStats) -> Result<()> {
    if let Some(http) = endpoint.as_http_mut() {
        while let Some(outcome) = http.try_read_outcome() {
            stats.outcomes.observe_outcome(&outcome);
            print_outcome(&outcome)?;
        }
    }
    Ok(())
}

/// Outcome bytes go to stdout untouched, one outcome per line
fn print_outcome(outcome: &Outcome) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&outcome.to_bytes())
        .and_then(|()| stdout.write_all(b"\n"))
        .context("Failed to write outcome")
}

/// Close the endpoint and print the outcomes still queued
async fn finish(endpoint: &mut Endpoint, stats: &mut SendStats) -> Result<()> {
    endpoint.flush().await.context("Failed to flush endpoint")?;
    endpoint.close().await.context("Failed to close endpoint")?;

    if let Some(http) = endpoint.as_http_mut() {
        while let Some(outcome) = http.read_outcome().await {
            stats.outcomes.observe_outcome(&outcome);
            print_outcome(&outcome)?;
        }
    }
    debug!("Endpoint closed");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_summary(endpoint: &Endpoint, stats: &SendStats) {
    eprintln!("\n=== Send Summary ===");
    eprintln!("Endpoint: {} ({})", endpoint.name(), endpoint.scheme());
    eprintln!("Lines read: {}", stats.lines_read);
    eprintln!("Records written: {}", stats.records_written);
    eprintln!("Records dropped: {}", stats.records_dropped);

    if let Some(http) = endpoint.as_http() {
        let s = http.stats();
        eprintln!("Batches sent: {}", s.batches_sent);
        eprintln!("Batch failures: {}", s.batch_failures);
        eprintln!("Outcomes dropped: {}", s.outcomes_dropped);
        eprint!("\n{}", stats.outcomes.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Target;

    fn args(target: Target, endpoint: Option<&str>) -> SendArgs {
        SendArgs {
            target,
            endpoint: endpoint.map(str::to_string),
            input: None,
            wait_ms: 100,
            metrics_port: 0,
            block: false,
            summary: false,
        }
    }

    fn config_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[endpoints]]
name = "statsd"
url = "udp://127.0.0.1:8125"

[[endpoints]]
name = "librato"
url = "librato://metrics-api.librato.com/v1/metrics"
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_resolve_from_url() {
        let target = Target {
            url: Some("tcp://127.0.0.1:2003".into()),
            config: None,
        };
        let config = resolve_endpoint(&args(target, None)).unwrap();
        assert_eq!(config.name, "cli");
        assert_eq!(config.url, "tcp://127.0.0.1:2003");
    }

    #[test]
    fn test_resolve_named_and_default_endpoint() {
        let file = config_file();
        let target = Target {
            url: None,
            config: Some(file.path().to_path_buf()),
        };

        let config = resolve_endpoint(&args(target.clone(), Some("librato"))).unwrap();
        assert_eq!(config.name, "librato");

        let config = resolve_endpoint(&args(target, None)).unwrap();
        assert_eq!(config.name, "statsd");
    }

    #[test]
    fn test_resolve_unknown_endpoint() {
        let file = config_file();
        let target = Target {
            url: None,
            config: Some(file.path().to_path_buf()),
        };
        let err = resolve_endpoint(&args(target, Some("missing"))).unwrap_err();
        assert!(matches!(err, CliError::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_send_file_to_file_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.txt");
        let output = dir.path().join("out.log");
        std::fs::write(&input, "cpu 1\n\nmem 2\n").unwrap();

        let target = Target {
            url: Some(format!("file://{}", output.display())),
            config: None,
        };
        let mut send = args(target, None);
        send.input = Some(input);
        run_send(&send).await.unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "cpu 1\nmem 2\n");
    }
}
