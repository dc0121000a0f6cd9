//! MemoryStore - latest result per healthcheck

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{HealthcheckResult, ResultStore, StoreConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

type Entries = HashMap<String, HealthcheckResult>;

/// Bounded in-memory store keyed by healthcheck name
pub struct MemoryStore {
    config: StoreConfig,
    entries: Arc<Mutex<Entries>>,
    cancel: CancellationToken,
    purge_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            purge_handle: Mutex::new(None),
        }
    }

    /// Latest result recorded for `name`
    pub fn get(&self, name: &str) -> Option<HealthcheckResult> {
        lock(&self.entries).get(name).cloned()
    }

    /// All retained results, sorted by name
    pub fn list(&self) -> Vec<HealthcheckResult> {
        let mut results: Vec<_> = lock(&self.entries).values().cloned().collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop results older than the configured TTL, relative to `now` (epoch seconds)
    ///
    /// Returns the number of purged results. Without a TTL nothing expires.
    pub fn purge_expired(&self, now: i64) -> usize {
        match self.config.ttl_secs {
            Some(ttl) => purge(&self.entries, ttl, now),
            None => 0,
        }
    }

    /// Stop the purge task (if running) and wait for it to exit
    #[instrument(name = "memory_store_stop", skip(self))]
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = lock(&self.purge_handle).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = ?e, "Purge task panicked");
            }
        }
        debug!("MemoryStore stopped");
    }
}

impl ResultStore for MemoryStore {
    fn start(&self) {
        let Some(ttl) = self.config.ttl_secs else {
            debug!("No TTL configured, purge task not started");
            return;
        };

        let mut slot = lock(&self.purge_handle);
        if slot.is_some() {
            warn!("MemoryStore already started");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "No tokio runtime, purge task not started");
                return;
            }
        };

        let period = Duration::from_secs(self.config.purge_interval_secs.max(1));
        let entries = Arc::clone(&self.entries);
        let cancel = self.cancel.clone();

        *slot = Some(runtime.spawn(purge_loop(entries, ttl, period, cancel)));

        info!(
            ttl_secs = ttl,
            purge_interval_secs = period.as_secs(),
            max_entries = self.config.max_entries,
            "MemoryStore started"
        );
    }

    fn add(&self, result: &HealthcheckResult) {
        let mut entries = lock(&self.entries);

        if !entries.contains_key(&result.name) && entries.len() >= self.config.max_entries {
            let oldest = entries
                .values()
                .min_by_key(|r| r.timestamp)
                .map(|r| r.name.clone());
            if let Some(name) = oldest {
                entries.remove(&name);
                debug!(evicted = %name, "Store full, evicted oldest result");
            }
        }

        entries.insert(result.name.clone(), result.clone());
    }
}

async fn purge_loop(
    entries: Arc<Mutex<Entries>>,
    ttl: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let purged = purge(&entries, ttl, chrono::Utc::now().timestamp());
                if purged > 0 {
                    debug!(purged, "Expired results purged");
                }
            }
        }
    }
}

fn purge(entries: &Mutex<Entries>, ttl: u64, now: i64) -> usize {
    let cutoff = now.saturating_sub(i64::try_from(ttl).unwrap_or(i64::MAX));
    let mut entries = lock(entries);
    let before = entries.len();
    entries.retain(|_, r| r.timestamp >= cutoff);
    before - entries.len()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
