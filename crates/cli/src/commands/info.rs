//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{EndpointConfig, OverflowPolicy, Scheme, SinkSettings};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
struct EndpointInfo {
    name: String,
    url: String,
    transport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batching: Option<BatchingInfo>,
}

#[derive(Serialize)]
struct BatchingInfo {
    queue_capacity: usize,
    max_batch_size: usize,
    flush_interval_ms: u64,
    response_capacity: usize,
    inbound_policy: OverflowPolicy,
    response_policy: OverflowPolicy,
    request_timeout_secs: u64,
    envelope_key: String,
    max_retries: u32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let settings = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&settings);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(settings: &SinkSettings) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", settings.version),
        endpoints: settings.endpoints.iter().map(endpoint_info).collect(),
    }
}

fn endpoint_info(endpoint: &EndpointConfig) -> EndpointInfo {
    let parsed = transport::parse_endpoint_url(&endpoint.url);
    let kind = match parsed {
        Ok((_, scheme)) => scheme.to_string(),
        Err(ref e) => format!("invalid ({e})"),
    };

    // Only the collector transport batches and has a rewritten URL
    let resolved_url = parsed
        .as_ref()
        .ok()
        .filter(|(_, scheme)| *scheme == Scheme::Librato)
        .and_then(|(url, _)| transport::normalize_collector_url(url).ok())
        .map(|url| url.to_string());

    let batching = resolved_url.as_ref().map(|_| BatchingInfo {
        queue_capacity: endpoint.batching.queue_capacity,
        max_batch_size: endpoint.batching.max_batch_size,
        flush_interval_ms: endpoint.batching.flush_interval_ms,
        response_capacity: endpoint.batching.response_capacity,
        inbound_policy: endpoint.batching.inbound_policy,
        response_policy: endpoint.batching.response_policy,
        request_timeout_secs: endpoint.http.request_timeout_secs,
        envelope_key: endpoint.http.envelope_key.clone(),
        max_retries: endpoint.retry.max_retries,
    });

    EndpointInfo {
        name: endpoint.name.clone(),
        url: endpoint.url.clone(),
        transport: kind,
        resolved_url,
        batching,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Metrics Sink Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Version: {}", info.version);
    println!("\n📤 Endpoints ({})", info.endpoints.len());
    for (i, endpoint) in info.endpoints.iter().enumerate() {
        let is_last = i == info.endpoints.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, endpoint.name, endpoint.transport);
        println!("   {}  ├─ URL: {}", child_prefix, endpoint.url);

        match (&endpoint.resolved_url, &endpoint.batching) {
            (Some(resolved), Some(b)) => {
                println!("   {}  ├─ Collector: {}", child_prefix, resolved);
                println!(
                    "   {}  ├─ Queue: {} records ({:?}), batch ≤ {} every {} ms",
                    child_prefix,
                    b.queue_capacity,
                    b.inbound_policy,
                    b.max_batch_size,
                    b.flush_interval_ms
                );
                println!(
                    "   {}  ├─ Responses: {} ({:?})",
                    child_prefix, b.response_capacity, b.response_policy
                );
                println!(
                    "   {}  └─ HTTP: timeout {} s, envelope \"{}\", retries {}",
                    child_prefix, b.request_timeout_secs, b.envelope_key, b.max_retries
                );
            }
            _ => println!("   {}  └─ Passthrough (no batching)", child_prefix),
        }
    }

    println!();
}
