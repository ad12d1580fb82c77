//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{SinkError, SinkSettings};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SinkSettings, SinkError> {
    toml::from_str(content).map_err(|e| SinkError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SinkSettings, SinkError> {
    serde_json::from_str(content).map_err(|e| SinkError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SinkSettings, SinkError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OverflowPolicy;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[endpoints]]
name = "librato"
url = "librato://metrics-api.librato.com/v1/metrics"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let settings = result.unwrap();
        assert_eq!(settings.endpoints.len(), 1);
        assert_eq!(settings.endpoints[0].batching.max_batch_size, 300);
        assert_eq!(settings.endpoints[0].http.envelope_key, "gauges");
    }

    #[test]
    fn test_parse_toml_tuning_sections() {
        let content = r#"
[[endpoints]]
name = "librato"
url = "librato://metrics-api.librato.com/v1/metrics"

[endpoints.batching]
queue_capacity = 50
max_batch_size = 10
inbound_policy = "block"

[endpoints.retry]
max_retries = 3
"#;
        let settings = parse_toml(content).unwrap();
        let endpoint = &settings.endpoints[0];
        assert_eq!(endpoint.batching.queue_capacity, 50);
        assert_eq!(endpoint.batching.max_batch_size, 10);
        assert_eq!(endpoint.batching.flush_interval_ms, 100);
        assert_eq!(endpoint.batching.inbound_policy, OverflowPolicy::Block);
        assert_eq!(endpoint.retry.max_retries, 3);
        assert_eq!(endpoint.retry.initial_delay_ms, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "endpoints": [
                { "name": "local", "url": "file:///tmp/metrics.log" },
                { "name": "statsd", "url": "udp://127.0.0.1:8125" }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().endpoints.len(), 2);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, SinkError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_policy() {
        let content = r#"
[[endpoints]]
name = "x"
url = "librato://host/v1"
[endpoints.batching]
inbound_policy = "drop_oldest"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(SinkError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
