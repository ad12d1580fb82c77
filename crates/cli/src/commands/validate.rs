//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{OverflowPolicy, Scheme, SinkSettings};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    endpoint_count: usize,
    http_endpoint_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(settings) => {
            let warnings = collect_warnings(&settings);
            let http_endpoint_count = settings
                .endpoints
                .iter()
                .filter(|e| scheme_of(&e.url) == Some(Scheme::Librato))
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", settings.version),
                    endpoint_count: settings.endpoints.len(),
                    http_endpoint_count,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn scheme_of(url: &str) -> Option<Scheme> {
    transport::parse_endpoint_url(url)
        .ok()
        .map(|(_, scheme)| scheme)
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(settings: &SinkSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.endpoints.is_empty() {
        warnings.push("No endpoints configured - nothing will be delivered".to_string());
    }

    for endpoint in &settings.endpoints {
        if scheme_of(&endpoint.url) != Some(Scheme::Librato) {
            continue;
        }
        let batching = &endpoint.batching;

        if batching.max_batch_size > batching.queue_capacity {
            warnings.push(format!(
                "Endpoint '{}': max_batch_size ({}) exceeds queue_capacity ({}), batches will be cut by the ticker",
                endpoint.name, batching.max_batch_size, batching.queue_capacity
            ));
        }
        if batching.response_policy == OverflowPolicy::Block && batching.response_capacity < 10 {
            warnings.push(format!(
                "Endpoint '{}': small response_capacity with block policy stalls delivery when outcomes are not read",
                endpoint.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Endpoints: {}", summary.endpoint_count);
            println!("  HTTP collectors: {}", summary.http_endpoint_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
