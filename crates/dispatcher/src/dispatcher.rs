//! Dispatcher - lifecycle and drain loop for fan-out to exporters

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use contracts::{Exporter, ExporterConfig, ExporterType, HealthcheckResult, ResultStore};

use crate::error::DispatcherError;
use crate::exporters::{FileExporter, HttpExporter, LogExporter};
use crate::handle::ExporterHandle;
use crate::metrics::{ExporterMetrics, MetricsSnapshot};

/// Dispatcher configuration
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Exporter configurations, in fan-out order
    pub exporters: Vec<ExporterConfig>,
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Created,
    Running,
    /// Cancellation sent, waiting for the drain loop to return
    Stopping,
    Stopped,
}

/// Builder for creating a Dispatcher from configuration
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    store: Arc<dyn ResultStore>,
    inbox: mpsc::Receiver<HealthcheckResult>,
}

impl DispatcherBuilder {
    pub fn new(
        config: DispatcherConfig,
        store: Arc<dyn ResultStore>,
        inbox: mpsc::Receiver<HealthcheckResult>,
    ) -> Self {
        Self {
            config,
            store,
            inbox,
        }
    }

    /// Build every exporter, start it, and assemble the dispatcher
    ///
    /// If an exporter fails to start, the ones already started are stopped
    /// before the error is returned.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(exporter_count = self.config.exporters.len())
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles: Vec<ExporterHandle> = Vec::with_capacity(self.config.exporters.len());

        for exporter_config in &self.config.exporters {
            let mut handle = ExporterHandle::new(create_exporter(exporter_config)?);
            if let Err(source) = handle.start().await {
                release_started(&mut handles).await;
                return Err(DispatcherError::exporter_start(&exporter_config.name, source));
            }
            handles.push(handle);
        }

        Ok(Dispatcher::from_handles(self.store, handles, self.inbox))
    }
}

/// Create an exporter from configuration
#[instrument(
    name = "dispatcher_create_exporter",
    skip(config),
    fields(exporter = %config.name, exporter_type = ?config.exporter_type)
)]
pub fn create_exporter(config: &ExporterConfig) -> Result<Box<dyn Exporter>, DispatcherError> {
    match config.exporter_type {
        ExporterType::Log => Ok(Box::new(LogExporter::new(&config.name))),
        ExporterType::File => {
            let exporter = FileExporter::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::exporter_creation(&config.name, e.to_string()))?;
            Ok(Box::new(exporter))
        }
        ExporterType::Http => {
            let exporter = HttpExporter::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::exporter_creation(&config.name, e.to_string()))?;
            Ok(Box::new(exporter))
        }
    }
}

async fn release_started(handles: &mut [ExporterHandle]) {
    for handle in handles.iter_mut() {
        if let Err(e) = handle.stop().await {
            warn!(exporter = %handle.name(), error = %e, "Failed to release exporter");
        }
    }
}

/// The Dispatcher that records results and fans them out to exporters
///
/// Exporters are owned by the drain loop while running and handed back when
/// it exits, so they are never touched by two tasks at once.
pub struct Dispatcher {
    store: Arc<dyn ResultStore>,
    /// Exporters, present whenever the drain loop is not running
    handles: Vec<ExporterHandle>,
    /// Metrics of every exporter, in registration order
    exporter_metrics: Vec<(String, Arc<ExporterMetrics>)>,
    inbox: Option<mpsc::Receiver<HealthcheckResult>>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<Vec<ExporterHandle>>>,
    processed: Arc<AtomicU64>,
    state: DispatcherState,
}

impl Dispatcher {
    /// Create a dispatcher over already started exporters
    pub fn new(
        store: Arc<dyn ResultStore>,
        exporters: Vec<Box<dyn Exporter>>,
        inbox: mpsc::Receiver<HealthcheckResult>,
    ) -> Self {
        let handles = exporters.into_iter().map(ExporterHandle::new).collect();
        Self::from_handles(store, handles, inbox)
    }

    fn from_handles(
        store: Arc<dyn ResultStore>,
        handles: Vec<ExporterHandle>,
        inbox: mpsc::Receiver<HealthcheckResult>,
    ) -> Self {
        let exporter_metrics = handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();

        Self {
            store,
            handles,
            exporter_metrics,
            inbox: Some(inbox),
            cancel: CancellationToken::new(),
            worker: None,
            processed: Arc::new(AtomicU64::new(0)),
            state: DispatcherState::Created,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Number of registered exporters
    pub fn exporter_count(&self) -> usize {
        self.exporter_metrics.len()
    }

    /// Results fully dispatched so far
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Get metrics for all exporters
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.exporter_metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect()
    }

    /// Start the store and spawn the drain loop
    ///
    /// Returns as soon as the task is spawned. Only the first call has an
    /// effect. Outside a Tokio runtime nothing is spawned and the dispatcher
    /// stays `Created`.
    #[instrument(name = "dispatcher_start", skip(self))]
    pub fn start(&mut self) {
        if self.state != DispatcherState::Created {
            warn!(state = ?self.state, "Dispatcher already started, ignoring");
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "No tokio runtime, dispatcher not started");
                return;
            }
        };
        let Some(inbox) = self.inbox.take() else {
            warn!("Dispatcher inbox missing, ignoring start");
            return;
        };

        info!(exporters = self.handles.len(), "Starting dispatcher");
        self.store.start();

        let drain = DrainLoop {
            store: Arc::clone(&self.store),
            handles: mem::take(&mut self.handles),
            inbox,
            cancel: self.cancel.clone(),
            processed: Arc::clone(&self.processed),
        };
        self.worker = Some(runtime.spawn(drain.run()));
        self.state = DispatcherState::Running;
    }

    /// Stop the drain loop, then stop every exporter in registration order
    ///
    /// Results still queued in the inbox are dropped. The first exporter
    /// that fails to stop aborts the sequence: its error is returned and the
    /// exporters after it are left running.
    #[instrument(name = "dispatcher_stop", skip(self))]
    pub async fn stop(&mut self) -> Result<(), DispatcherError> {
        match self.state {
            DispatcherState::Stopping | DispatcherState::Stopped => {
                debug!("Dispatcher already stopped");
                return Ok(());
            }
            DispatcherState::Created => {}
            DispatcherState::Running => {
                self.state = DispatcherState::Stopping;
                self.cancel.cancel();

                if let Some(worker) = self.worker.take() {
                    match worker.await {
                        Ok(handles) => self.handles = handles,
                        Err(e) => {
                            self.state = DispatcherState::Stopped;
                            return Err(DispatcherError::WorkerPanicked {
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        self.state = DispatcherState::Stopped;
        info!(processed = self.processed_count(), "Dispatcher loop exited");

        for handle in &mut self.handles {
            handle
                .stop()
                .await
                .map_err(|source| DispatcherError::exporter_stop(handle.name(), source))?;
        }

        info!("Dispatcher shutdown complete");
        Ok(())
    }
}

/// State moved into the background task
struct DrainLoop {
    store: Arc<dyn ResultStore>,
    handles: Vec<ExporterHandle>,
    inbox: mpsc::Receiver<HealthcheckResult>,
    cancel: CancellationToken,
    processed: Arc<AtomicU64>,
}

impl DrainLoop {
    #[instrument(name = "dispatcher_drain_loop", skip(self), fields(exporters = self.handles.len()))]
    async fn run(mut self) -> Vec<ExporterHandle> {
        debug!("Drain loop started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,
                received = self.inbox.recv() => match received {
                    Some(result) => self.dispatch(&result).await,
                    None => {
                        // Every producer is gone; only stop() ends the loop
                        debug!("Inbox closed, waiting for stop");
                        self.cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        debug!(dropped = self.inbox.len(), "Drain loop stopped");
        self.handles
    }

    async fn dispatch(&mut self, result: &HealthcheckResult) {
        self.store.add(result);

        if result.success {
            info!(
                name = %result.name,
                timestamp = result.timestamp,
                "Healthcheck successful"
            );
        } else {
            info!(
                name = %result.name,
                message = %result.message,
                timestamp = result.timestamp,
                "Healthcheck failed"
            );
        }
        observability::record_result_processed(result);
        observability::record_inbox_depth(self.inbox.len());

        for handle in &mut self.handles {
            handle.push(result).await;
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Convenience function to create a dispatcher from exporter configs
#[instrument(name = "dispatcher_create", skip(exporter_configs, store, inbox))]
pub async fn create_dispatcher(
    exporter_configs: Vec<ExporterConfig>,
    store: Arc<dyn ResultStore>,
    inbox: mpsc::Receiver<HealthcheckResult>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        exporters: exporter_configs,
    };
    DispatcherBuilder::new(config, store, inbox).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contracts::{ContractError, Healthcheck};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Added(HealthcheckResult),
        Pushed(String, HealthcheckResult),
        Stopped(String),
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    struct RecordingStore {
        started: AtomicBool,
        events: EventLog,
    }

    impl ResultStore for RecordingStore {
        fn start(&self) {
            self.started.store(true, Ordering::SeqCst);
        }

        fn add(&self, result: &HealthcheckResult) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Added(result.clone()));
        }
    }

    struct RecordingExporter {
        name: String,
        events: EventLog,
        fail_push: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl Exporter for RecordingExporter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), ContractError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Stopped(self.name.clone()));
            if self.fail_stop {
                return Err(ContractError::exporter_connection(&self.name, "refused"));
            }
            Ok(())
        }

        async fn push(&mut self, result: &HealthcheckResult) -> Result<(), ContractError> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Pushed(self.name.clone(), result.clone()));
            if self.fail_push {
                return Err(ContractError::exporter_push(&self.name, "unreachable"));
            }
            Ok(())
        }
    }

    struct Check(&'static str);

    impl Healthcheck for Check {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Fixture {
        events: EventLog,
        store: Arc<RecordingStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let events: EventLog = Arc::new(Mutex::new(Vec::new()));
            let store = Arc::new(RecordingStore {
                started: AtomicBool::new(false),
                events: Arc::clone(&events),
            });
            Self { events, store }
        }

        fn exporter(&self, name: &str) -> Box<dyn Exporter> {
            self.exporter_with(name, false, false)
        }

        fn exporter_with(&self, name: &str, fail_push: bool, fail_stop: bool) -> Box<dyn Exporter> {
            Box::new(RecordingExporter {
                name: name.to_string(),
                events: Arc::clone(&self.events),
                fail_push,
                fail_stop,
            })
        }

        fn dispatcher(
            &self,
            exporters: Vec<Box<dyn Exporter>>,
        ) -> (mpsc::Sender<HealthcheckResult>, Dispatcher) {
            let (tx, rx) = mpsc::channel(64);
            let store: Arc<dyn ResultStore> = self.store.clone();
            (tx, Dispatcher::new(store, exporters, rx))
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn added(&self) -> Vec<HealthcheckResult> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Added(r) => Some(r),
                    _ => None,
                })
                .collect()
        }

        fn pushed_to(&self, exporter: &str) -> Vec<HealthcheckResult> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Pushed(name, r) if name == exporter => Some(r),
                    _ => None,
                })
                .collect()
        }

        fn stopped(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Stopped(name) => Some(name),
                    _ => None,
                })
                .collect()
        }
    }

    fn result(name: &'static str, success: bool, timestamp: i64) -> HealthcheckResult {
        let error = "timeout";
        let error = if success {
            None
        } else {
            Some(&error as &dyn std::fmt::Display)
        };
        HealthcheckResult::with_timestamp(&Check(name), timestamp, 0.01, error)
    }

    async fn wait_for(dispatcher: &Dispatcher, processed: u64) {
        for _ in 0..400 {
            if dispatcher.processed_count() >= processed {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "dispatcher processed {} of {} results",
            dispatcher.processed_count(),
            processed
        );
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let fixture = Fixture::new();
        let (_tx, mut dispatcher) = fixture.dispatcher(vec![fixture.exporter("a")]);
        assert_eq!(dispatcher.state(), DispatcherState::Created);
        assert_eq!(dispatcher.exporter_count(), 1);

        dispatcher.start();
        assert_eq!(dispatcher.state(), DispatcherState::Running);
        assert!(fixture.store.started.load(Ordering::SeqCst));

        // Second start is ignored
        dispatcher.start();
        assert_eq!(dispatcher.state(), DispatcherState::Running);

        dispatcher.stop().await.unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
        assert_eq!(fixture.stopped(), vec!["a"]);

        // Second stop is a no-op
        dispatcher.stop().await.unwrap();
        assert_eq!(fixture.stopped(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_single_result_scenario() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) =
            fixture.dispatcher(vec![fixture.exporter("a"), fixture.exporter("b")]);
        dispatcher.start();

        let disk = result("disk", true, 1_700_000_000);
        tx.send(disk.clone()).await.unwrap();
        wait_for(&dispatcher, 1).await;
        dispatcher.stop().await.unwrap();

        assert_eq!(fixture.added(), vec![disk.clone()]);
        assert_eq!(fixture.pushed_to("a"), vec![disk.clone()]);
        assert_eq!(fixture.pushed_to("b"), vec![disk]);
    }

    #[tokio::test]
    async fn test_fifo_order_and_fanout_completeness() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) = fixture.dispatcher(vec![
            fixture.exporter("a"),
            fixture.exporter("b"),
            fixture.exporter("c"),
        ]);
        dispatcher.start();

        let sent: Vec<_> = (0..20)
            .map(|i| result("disk", i % 3 != 0, 1_700_000_000 + i))
            .collect();
        for r in &sent {
            tx.send(r.clone()).await.unwrap();
        }
        wait_for(&dispatcher, 20).await;
        dispatcher.stop().await.unwrap();

        assert_eq!(fixture.added(), sent);
        for name in ["a", "b", "c"] {
            assert_eq!(fixture.pushed_to(name), sent);
        }
        for (_, snapshot) in dispatcher.metrics() {
            assert_eq!(snapshot.push_count, 20);
        }
    }

    #[tokio::test]
    async fn test_store_before_exporters_in_registration_order() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) =
            fixture.dispatcher(vec![fixture.exporter("first"), fixture.exporter("second")]);
        dispatcher.start();

        let r = result("dns", false, 1_700_000_000);
        tx.send(r.clone()).await.unwrap();
        wait_for(&dispatcher, 1).await;
        dispatcher.stop().await.unwrap();

        let events = fixture.events();
        assert_eq!(
            &events[..3],
            &[
                Event::Added(r.clone()),
                Event::Pushed("first".into(), r.clone()),
                Event::Pushed("second".into(), r),
            ]
        );
    }

    #[tokio::test]
    async fn test_push_failure_does_not_skip_later_exporters() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) = fixture.dispatcher(vec![
            fixture.exporter_with("broken", true, false),
            fixture.exporter("healthy"),
        ]);
        dispatcher.start();

        for i in 0..3 {
            tx.send(result("disk", true, i)).await.unwrap();
        }
        wait_for(&dispatcher, 3).await;
        dispatcher.stop().await.unwrap();

        assert_eq!(fixture.added().len(), 3);
        assert_eq!(fixture.pushed_to("healthy").len(), 3);

        let metrics: HashMap<_, _> = dispatcher.metrics().into_iter().collect();
        assert_eq!(metrics["broken"].failure_count, 3);
        assert_eq!(metrics["healthy"].push_count, 3);
    }

    #[tokio::test]
    async fn test_stop_fails_fast() {
        let fixture = Fixture::new();
        let (_tx, mut dispatcher) = fixture.dispatcher(vec![
            fixture.exporter_with("first", false, true),
            fixture.exporter("second"),
        ]);
        dispatcher.start();

        let err = dispatcher.stop().await.unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::ExporterStop { ref name, .. } if name == "first"
        ));
        assert!(err.to_string().contains("failed to stop exporter 'first'"));
        assert_eq!(fixture.stopped(), vec!["first"]);
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_without_start_stops_exporters() {
        let fixture = Fixture::new();
        let (_tx, mut dispatcher) =
            fixture.dispatcher(vec![fixture.exporter("a"), fixture.exporter("b")]);

        dispatcher.stop().await.unwrap();
        assert_eq!(fixture.stopped(), vec!["a", "b"]);
        assert!(!fixture.store.started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_closed_inbox_keeps_loop_alive_until_stop() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) = fixture.dispatcher(vec![fixture.exporter("a")]);
        dispatcher.start();

        tx.send(result("disk", true, 1)).await.unwrap();
        drop(tx);
        wait_for(&dispatcher, 1).await;
        sleep(Duration::from_millis(20)).await;

        assert_eq!(dispatcher.state(), DispatcherState::Running);
        dispatcher.stop().await.unwrap();
        assert_eq!(fixture.stopped(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_results_after_stop_are_dropped() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) = fixture.dispatcher(vec![fixture.exporter("a")]);
        dispatcher.start();

        for i in 0..50 {
            tx.send(result("disk", true, i)).await.unwrap();
        }
        dispatcher.stop().await.unwrap();

        // Receiver is gone once the loop has exited
        assert!(tx.send(result("disk", true, 99)).await.is_err());
        assert!(fixture.added().len() <= 50);
        assert_eq!(fixture.pushed_to("a").len(), fixture.added().len());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_stop_wins_over_queued_results() {
        let fixture = Fixture::new();
        let (tx, mut dispatcher) = fixture.dispatcher(vec![fixture.exporter("a")]);

        for i in 0..10 {
            tx.try_send(result("disk", true, i)).unwrap();
        }

        // The drain task is first polled after cancellation
        dispatcher.start();
        dispatcher.stop().await.unwrap();

        assert!(fixture.added().is_empty());
        assert!(fixture.pushed_to("a").is_empty());
        assert_eq!(dispatcher.processed_count(), 0);
        assert_eq!(fixture.stopped(), vec!["a"]);
    }

    #[test]
    fn test_start_outside_runtime_is_noop() {
        let fixture = Fixture::new();
        let (_tx, mut dispatcher) = fixture.dispatcher(vec![fixture.exporter("a")]);

        dispatcher.start();

        assert_eq!(dispatcher.state(), DispatcherState::Created);
        assert!(!fixture.store.started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let fixture = Fixture::new();
        let (tx, rx) = mpsc::channel(10);

        let configs = vec![ExporterConfig {
            name: "test_log".to_string(),
            exporter_type: ExporterType::Log,
            params: HashMap::new(),
        }];

        let store: Arc<dyn ResultStore> = fixture.store.clone();
        let mut dispatcher = create_dispatcher(configs, store, rx).await.unwrap();
        assert_eq!(dispatcher.exporter_count(), 1);
        dispatcher.start();

        tx.send(result("disk", true, 1)).await.unwrap();
        wait_for(&dispatcher, 1).await;
        dispatcher.stop().await.unwrap();

        assert_eq!(dispatcher.metrics()[0].0, "test_log");
        assert_eq!(dispatcher.metrics()[0].1.push_count, 1);
    }

    #[tokio::test]
    async fn test_create_exporter_rejects_bad_params() {
        let config = ExporterConfig {
            name: "central".to_string(),
            exporter_type: ExporterType::Http,
            params: HashMap::new(),
        };
        let err = create_exporter(&config).err().unwrap();
        assert!(matches!(err, DispatcherError::ExporterCreation { .. }));
    }
}
