//! 配置校验模块
//!
//! 校验规则：
//! - endpoint name 非空且唯一
//! - url 可解析，scheme 有对应 transport
//! - 队列容量 / batch 大小 / flush 间隔 > 0
//! - envelope_key 非空
//! - initial_delay_ms <= max_delay_ms

use std::collections::HashSet;

use contracts::{EndpointConfig, Scheme, SinkError, SinkSettings};
use url::Url;

/// 校验 SinkSettings 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(settings: &SinkSettings) -> Result<(), SinkError> {
    validate_names(settings)?;
    for (idx, endpoint) in settings.endpoints.iter().enumerate() {
        validate_url(idx, endpoint)?;
        validate_batching(idx, endpoint)?;
        validate_http(idx, endpoint)?;
        validate_retry(idx, endpoint)?;
    }
    Ok(())
}

/// 校验 endpoint name 非空且唯一
fn validate_names(settings: &SinkSettings) -> Result<(), SinkError> {
    let mut seen = HashSet::new();
    for (idx, endpoint) in settings.endpoints.iter().enumerate() {
        if endpoint.name.trim().is_empty() {
            return Err(SinkError::config_validation(
                format!("endpoints[{idx}].name"),
                "endpoint name cannot be empty",
            ));
        }
        if !seen.insert(endpoint.name.as_str()) {
            return Err(SinkError::config_validation(
                format!("endpoints[name={}]", endpoint.name),
                "duplicate endpoint name",
            ));
        }
    }
    Ok(())
}

/// 校验 url 与 scheme
fn validate_url(idx: usize, endpoint: &EndpointConfig) -> Result<(), SinkError> {
    let field = format!("endpoints[{idx}].url");
    let url = Url::parse(&endpoint.url).map_err(|e| {
        SinkError::config_validation(&field, format!("invalid url '{}': {e}", endpoint.url))
    })?;

    let scheme = Scheme::parse(url.scheme())
        .map_err(|e| SinkError::config_validation(&field, e.to_string()))?;

    let needs_host = !matches!(scheme, Scheme::File);
    if needs_host && url.host_str().is_none_or(str::is_empty) {
        return Err(SinkError::config_validation(
            field,
            format!("'{}' url requires a host", scheme),
        ));
    }
    if matches!(scheme, Scheme::Udp | Scheme::Tcp) && url.port().is_none() {
        return Err(SinkError::config_validation(
            field,
            format!("'{}' url requires a port", scheme),
        ));
    }
    Ok(())
}

/// 校验队列与 batch 参数
fn validate_batching(idx: usize, endpoint: &EndpointConfig) -> Result<(), SinkError> {
    let batching = &endpoint.batching;
    let positive = [
        ("queue_capacity", batching.queue_capacity as u64),
        ("max_batch_size", batching.max_batch_size as u64),
        ("flush_interval_ms", batching.flush_interval_ms),
        ("response_capacity", batching.response_capacity as u64),
    ];

    for (name, value) in positive {
        if value == 0 {
            return Err(SinkError::config_validation(
                format!("endpoints[{idx}].batching.{name}"),
                format!("{name} must be > 0"),
            ));
        }
    }
    Ok(())
}

/// 校验 HTTP 参数
fn validate_http(idx: usize, endpoint: &EndpointConfig) -> Result<(), SinkError> {
    let http = &endpoint.http;
    if http.request_timeout_secs == 0 {
        return Err(SinkError::config_validation(
            format!("endpoints[{idx}].http.request_timeout_secs"),
            "request_timeout_secs must be > 0",
        ));
    }
    if http.envelope_key.is_empty() {
        return Err(SinkError::config_validation(
            format!("endpoints[{idx}].http.envelope_key"),
            "envelope_key cannot be empty",
        ));
    }
    Ok(())
}

/// 校验重试退避参数
fn validate_retry(idx: usize, endpoint: &EndpointConfig) -> Result<(), SinkError> {
    let retry = &endpoint.retry;
    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(SinkError::config_validation(
            format!("endpoints[{idx}].retry.initial_delay_ms / retry.max_delay_ms"),
            format!(
                "initial_delay_ms ({}) must be <= max_delay_ms ({})",
                retry.initial_delay_ms, retry.max_delay_ms
            ),
        ));
    }
    Ok(())
}
