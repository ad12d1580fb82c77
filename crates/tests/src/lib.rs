//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 collector e2e 测试（无需真实服务）
//! - 配置加载到 endpoint 打开的完整链路

#[cfg(test)]
mod contract_tests {
    use contracts::{BatchingConfig, OverflowPolicy, SinkError};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_overflow_policies() {
        let batching = BatchingConfig::default();
        assert_eq!(batching.inbound_policy, OverflowPolicy::DropNewest);
        assert_eq!(batching.response_policy, OverflowPolicy::Block);
    }

    #[test]
    fn test_truncation_message() {
        let err = SinkError::ResponseTruncated {
            copied: 4,
            total: 10,
        };
        assert_eq!(err.to_string(), "response truncated: copied 4 of 10 bytes");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use bytes::Bytes;
    use contracts::{BatchingConfig, EndpointConfig, MetricsEndpoint, OverflowPolicy, SinkError};
    use observability::DeliveryStatsAggregator;
    use transport::mock::{MockCollector, MockReply, RecordingSender};
    use transport::{open, HttpEndpoint, RetryPolicy, RetryingSender};

    fn fast_config(url: &str) -> EndpointConfig {
        let mut config = EndpointConfig::new("librato", url);
        config.batching.flush_interval_ms = 20;
        config
    }

    /// End-to-end: HttpEndpoint -> MockCollector -> Outcome
    ///
    /// 验证完整的数据流：
    /// 1. 三条 record 在同一周期内写入
    /// 2. 一次 POST，body 为 gauges envelope
    /// 3. 读取到 "<status>\n<body>" 形式的 outcome
    #[tokio::test]
    async fn test_e2e_single_cycle() {
        let collector = MockCollector::start(vec![MockReply::ok(r#"{"status":"ok"}"#)])
            .await
            .unwrap();
        let mut endpoint = HttpEndpoint::connect(collector.url(), &fast_config("mock")).unwrap();

        for record in ["a", "b", "c"] {
            endpoint.write(record.as_bytes()).await.unwrap();
        }

        let mut buf = vec![0u8; 1024];
        let n = endpoint.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"200 OK\n{\"status\":\"ok\"}");

        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].header("content-type").as_deref(),
            Some("application/json")
        );
        assert_eq!(requests[0].body_text(), r#"{"gauges": [a,b,c]}"#);

        endpoint.close().await.unwrap();
        assert!(endpoint.try_read_outcome().is_none());
    }

    /// 多个生产者并发写入，所有 record 按批次送达
    #[tokio::test]
    async fn test_e2e_concurrent_producers() {
        let collector = MockCollector::start(vec![MockReply::ok("{}")]).await.unwrap();
        let mut config = fast_config("mock");
        config.batching.max_batch_size = 25;
        config.batching.inbound_policy = OverflowPolicy::Block;
        let mut endpoint = HttpEndpoint::connect(collector.url(), &config).unwrap();

        let mut producers = Vec::new();
        for p in 0..4 {
            let writer = endpoint.writer();
            producers.push(tokio::spawn(async move {
                for i in 0..50 {
                    writer.submit(format!("{{\"p\":{p},\"i\":{i}}}")).await.unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        endpoint.close().await.unwrap();

        let mut aggregator = DeliveryStatsAggregator::new();
        while let Some(outcome) = endpoint.read_outcome().await {
            aggregator.observe_outcome(&outcome);
        }

        let stats = endpoint.stats();
        assert_eq!(stats.records_accepted, 200);
        assert_eq!(stats.records_sent, 200);
        assert_eq!(stats.batch_failures, 0);
        assert_eq!(aggregator.total_outcomes, stats.batches_sent);

        // Every record appears exactly once and no batch exceeds the cap
        let mut total = 0;
        for request in collector.requests() {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let gauges = body["gauges"].as_array().unwrap();
            assert!(gauges.len() <= 25);
            total += gauges.len();
        }
        assert_eq!(total, 200);
    }

    /// 同一生产者的 record 跨批次保持 FIFO
    #[tokio::test]
    async fn test_e2e_fifo_across_batches() {
        let sender = RecordingSender::new();
        let batching = BatchingConfig {
            max_batch_size: 3,
            flush_interval_ms: 20,
            ..Default::default()
        };
        let mut endpoint = HttpEndpoint::spawn("fifo", sender.clone(), &batching);

        for i in 0..10 {
            endpoint.write(i.to_string().as_bytes()).await.unwrap();
        }
        endpoint.close().await.unwrap();

        let expected: Vec<Bytes> = (0..10).map(|i| Bytes::from(i.to_string())).collect();
        assert_eq!(sender.records(), expected);
        assert!(sender.batches().iter().all(|b| b.len() <= 3));
        assert_eq!(sender.max_in_flight(), 1);
    }

    /// 短缓冲区读取返回前缀并报告截断
    #[tokio::test]
    async fn test_e2e_short_read_truncates() {
        let collector = MockCollector::start(vec![MockReply::ok(r#"{"status":"ok"}"#)])
            .await
            .unwrap();
        let mut endpoint = HttpEndpoint::connect(collector.url(), &fast_config("mock")).unwrap();
        endpoint.write(b"x").await.unwrap();

        let mut buf = [0u8; 8];
        let err = endpoint.read(&mut buf).await.unwrap_err();
        match err {
            SinkError::ResponseTruncated { copied, total } => {
                assert_eq!(copied, 8);
                assert_eq!(total, "200 OK\n{\"status\":\"ok\"}".len());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(&buf, b"200 OK\n{");

        endpoint.close().await.unwrap();
    }

    /// 网络失败不产生 outcome，之后的 record 仍然送达
    #[tokio::test]
    async fn test_e2e_failure_then_recovery() {
        let collector =
            MockCollector::start(vec![MockReply::Hangup, MockReply::status(202, "accepted")])
                .await
                .unwrap();
        let mut endpoint = HttpEndpoint::connect(collector.url(), &fast_config("mock")).unwrap();

        endpoint.write(b"first").await.unwrap();
        collector.wait_for_requests(1, Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        endpoint.write(b"second").await.unwrap();
        let outcome = endpoint.read_outcome().await.unwrap();
        assert_eq!(outcome.to_bytes(), b"202 Accepted\naccepted");
        assert_eq!(outcome.status_code(), Some(202));

        let stats = endpoint.stats();
        assert_eq!(stats.batch_failures, 1);
        assert_eq!(stats.batches_sent, 1);

        endpoint.close().await.unwrap();
    }

    /// 重试层在网络失败后重新投递同一 batch
    #[tokio::test]
    async fn test_e2e_retry_layer_redelivers() {
        let collector = MockCollector::start(vec![MockReply::Hangup, MockReply::ok("{}")])
            .await
            .unwrap();
        let mut config = fast_config("mock");
        config.retry.max_retries = 2;
        config.retry.initial_delay_ms = 5;
        let mut endpoint = HttpEndpoint::connect(collector.url(), &config).unwrap();

        endpoint.write(b"payload").await.unwrap();
        let outcome = endpoint.read_outcome().await.unwrap();
        assert_eq!(outcome.status, "200 OK");

        let requests = collector.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
        assert_eq!(endpoint.stats().batch_failures, 0);

        endpoint.close().await.unwrap();
    }

    /// 入队满时 DropNewest 策略确定性拒绝
    #[tokio::test]
    async fn test_e2e_queue_full_rejects() {
        let sender = RecordingSender::new().with_delay(Duration::from_millis(200));
        let retrying = RetryingSender::new(
            sender.clone(),
            RetryPolicy {
                max_retries: 0,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
        );
        let batching = BatchingConfig {
            queue_capacity: 1,
            max_batch_size: 1,
            flush_interval_ms: 20,
            ..Default::default()
        };
        let mut endpoint = HttpEndpoint::spawn("full", retrying, &batching);

        endpoint.write(b"in-flight").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        endpoint.write(b"queued").await.unwrap();

        let err = endpoint.write(b"rejected").await.unwrap_err();
        assert!(matches!(err, SinkError::QueueFull { .. }));

        endpoint.close().await.unwrap();
        assert_eq!(
            sender.records(),
            vec![Bytes::from_static(b"in-flight"), Bytes::from_static(b"queued")]
        );
    }

    /// 配置文件 -> open() -> FileEndpoint
    #[tokio::test]
    async fn test_e2e_config_to_file_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("metrics.log");
        let content = format!(
            r#"
[[endpoints]]
name = "local"
url = "file://{}"
"#,
            log.display()
        );

        let settings =
            config_loader::ConfigLoader::load_from_str(&content, config_loader::ConfigFormat::Toml)
                .unwrap();
        let mut endpoint = open(settings.endpoint("local").unwrap()).await.unwrap();
        endpoint.write(b"cpu 0.5\n").await.unwrap();
        endpoint.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "cpu 0.5\n");
    }

    /// 配置文件 -> open() -> librato 规范化为 https
    #[tokio::test]
    async fn test_e2e_config_librato_endpoint() {
        let content = r#"
[[endpoints]]
name = "librato"
url = "librato://metrics-api.librato.com/v1/metrics"

[endpoints.batching]
max_batch_size = 50
"#;
        let settings =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();
        let mut endpoint = open(settings.endpoint("librato").unwrap()).await.unwrap();
        assert!(endpoint.as_http().is_some());
        endpoint.close().await.unwrap();
    }
}
