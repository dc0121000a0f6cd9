//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端分发测试（配置 -> 存储 -> exporter）

#[cfg(test)]
mod contract_tests {
    use std::collections::HashMap;

    use contracts::{Healthcheck, HealthcheckResult};

    struct PingCheck;

    impl Healthcheck for PingCheck {
        fn name(&self) -> &str {
            "ping"
        }

        fn labels(&self) -> HashMap<String, String> {
            HashMap::from([("region".to_string(), "eu".to_string())])
        }
    }

    #[test]
    fn test_result_wire_shape() {
        let result = HealthcheckResult::with_timestamp(&PingCheck, 1_700_000_000, 0.25, None);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["name"], "ping");
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "success");
        assert_eq!(json["healthcheck-timestamp"], 1_700_000_000);
        assert_eq!(json["labels"]["region"], "eu");
        assert!(json.get("summary").is_none() || json["summary"].is_null());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, Exporter, Healthcheck, HealthcheckResult, ResultStore, StoreConfig,
    };
    use dispatcher::{create_dispatcher, Dispatcher, DispatcherState};
    use memory_store::MemoryStore;
    use observability::ResultStatsAggregator;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    struct Check {
        name: &'static str,
        labels: HashMap<String, String>,
    }

    impl Check {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                labels: HashMap::new(),
            }
        }
    }

    impl Healthcheck for Check {
        fn name(&self) -> &str {
            self.name
        }

        fn labels(&self) -> HashMap<String, String> {
            self.labels.clone()
        }
    }

    fn result(name: &'static str, ts: i64, error: Option<&str>) -> HealthcheckResult {
        let error = error.map(str::to_string);
        let error = error.as_ref().map(|e| e as &dyn std::fmt::Display);
        HealthcheckResult::with_timestamp(&Check::new(name), ts, 0.05, error)
    }

    /// Exporter that keeps everything it is given
    #[derive(Clone, Default)]
    struct CollectingExporter {
        received: Arc<Mutex<Vec<HealthcheckResult>>>,
    }

    #[async_trait]
    impl Exporter for CollectingExporter {
        fn name(&self) -> &str {
            "collector"
        }

        async fn start(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
            self.received.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    async fn wait_processed(dispatcher: &Dispatcher, expected: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while dispatcher.processed_count() < expected {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dispatcher did not drain in time");
    }

    /// End-to-end test: config -> MemoryStore + Dispatcher -> file/log exporters
    #[tokio::test]
    async fn test_e2e_config_driven_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        let toml = format!(
            r#"
inbox_capacity = 8

[store]
max_entries = 16

[[exporters]]
name = "console"
exporter_type = "log"

[[exporters]]
name = "archive"
exporter_type = "file"
params = {{ path = "{}" }}
"#,
            path.display().to_string().replace('\\', "\\\\")
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let store = Arc::new(MemoryStore::new(config.store.clone()));
        let (tx, rx) = mpsc::channel(config.inbox_capacity);
        let store_handle: Arc<dyn ResultStore> = store.clone();
        let mut dispatcher = create_dispatcher(config.exporters.clone(), store_handle, rx)
            .await
            .unwrap();
        assert_eq!(dispatcher.exporter_count(), 2);

        dispatcher.start();
        assert_eq!(dispatcher.state(), DispatcherState::Running);

        let sent = vec![
            result("disk", 100, None),
            result("dns", 101, Some("timeout")),
            result("disk", 102, Some("disk full")),
        ];
        let mut stats = ResultStatsAggregator::new();
        for r in &sent {
            stats.update(r);
            tx.send(r.clone()).await.unwrap();
        }

        wait_processed(&dispatcher, 3).await;
        dispatcher.stop().await.unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);

        // Store keeps the latest result per healthcheck
        assert_eq!(store.len(), 2);
        let disk = store.get("disk").unwrap();
        assert_eq!(disk.timestamp, 102);
        assert!(!disk.success);
        assert_eq!(disk.message, "disk full");

        // File exporter saw every result in order
        let written: Vec<HealthcheckResult> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(written.len(), 3);
        for (got, want) in written.iter().zip(&sent) {
            assert!(got.equals(want));
        }

        for (_, snapshot) in dispatcher.metrics() {
            assert_eq!(snapshot.push_count, 3);
            assert_eq!(snapshot.failure_count, 0);
        }
        assert_eq!(stats.summary().failures, 2);
    }

    /// Results are stored before any exporter sees them
    #[tokio::test]
    async fn test_e2e_store_visible_to_exporter() {
        let store = Arc::new(MemoryStore::new(StoreConfig::default()));
        let collector = CollectingExporter::default();
        let received = collector.received.clone();

        let (tx, rx) = mpsc::channel(4);
        let store_handle: Arc<dyn ResultStore> = store.clone();
        let mut dispatcher = Dispatcher::new(store_handle, vec![Box::new(collector)], rx);
        dispatcher.start();

        tx.send(result("api", 1, None)).await.unwrap();
        wait_processed(&dispatcher, 1).await;

        assert!(store.get("api").is_some());
        assert_eq!(received.lock().unwrap().len(), 1);

        dispatcher.stop().await.unwrap();
        store.stop().await;
    }

    /// Store TTL purge drops stale healthchecks while the dispatcher keeps running
    #[tokio::test]
    async fn test_e2e_store_ttl_purge() {
        let store = Arc::new(MemoryStore::new(StoreConfig {
            ttl_secs: Some(60),
            purge_interval_secs: 1,
            max_entries: 8,
        }));

        let (tx, rx) = mpsc::channel(4);
        let store_handle: Arc<dyn ResultStore> = store.clone();
        let mut dispatcher = Dispatcher::new(store_handle, Vec::new(), rx);
        dispatcher.start();

        // Far in the past, expired on the next purge tick
        tx.send(result("legacy", 0, None)).await.unwrap();
        wait_processed(&dispatcher, 1).await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty() {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("purge task did not expire the result");

        dispatcher.stop().await.unwrap();
        store.stop().await;
    }
}
