//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce `SinkSettings`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let settings = ConfigLoader::load_from_path(Path::new("sink.toml")).unwrap();
//! for endpoint in &settings.endpoints {
//!     println!("{} -> {}", endpoint.name, endpoint.url);
//! }
//! ```

mod parser;
mod validator;

pub use contracts::SinkSettings;
pub use parser::ConfigFormat;

use contracts::SinkError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SinkSettings, SinkError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<SinkSettings, SinkError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate settings built in code
    pub fn validate(settings: &SinkSettings) -> Result<(), SinkError> {
        validator::validate(settings)
    }

    /// Serialize SinkSettings to TOML string
    pub fn to_toml(settings: &SinkSettings) -> Result<String, SinkError> {
        toml::to_string_pretty(settings)
            .map_err(|e| SinkError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SinkSettings to JSON string
    pub fn to_json(settings: &SinkSettings) -> Result<String, SinkError> {
        serde_json::to_string_pretty(settings)
            .map_err(|e| SinkError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, SinkError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            SinkError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| SinkError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, SinkError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<SinkSettings, SinkError> {
        let settings = parser::parse(content, format)?;
        validator::validate(&settings)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[[endpoints]]
name = "librato"
url = "librato://metrics-api.librato.com/v1/metrics"

[endpoints.batching]
max_batch_size = 100
flush_interval_ms = 250

[endpoints.retry]
max_retries = 2

[[endpoints]]
name = "local"
url = "file:///tmp/metrics.log"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let settings = result.unwrap();
        assert_eq!(settings.endpoints.len(), 2);
        let librato = settings.endpoint("librato").unwrap();
        assert_eq!(librato.batching.max_batch_size, 100);
        assert_eq!(librato.retry.max_retries, 2);
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&settings).unwrap();
        let settings2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(settings.endpoints.len(), settings2.endpoints.len());
        assert_eq!(settings.endpoints[0].url, settings2.endpoints[0].url);
        assert_eq!(
            settings.endpoints[0].batching.flush_interval_ms,
            settings2.endpoints[0].batching.flush_interval_ms
        );
    }

    #[test]
    fn test_round_trip_json() {
        let settings = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&settings).unwrap();
        let settings2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(settings.endpoints[1].name, settings2.endpoints[1].name);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[endpoints]]
name = "dup"
url = "udp://127.0.0.1:8125"

[[endpoints]]
name = "dup"
url = "tcp://127.0.0.1:2003"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ConfigLoader::load_from_path(Path::new("sink.yaml"));
        assert!(matches!(result, Err(SinkError::ConfigParse { .. })));
    }
}
