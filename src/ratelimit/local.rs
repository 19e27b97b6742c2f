//! In-process counter store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::backend::{CounterStore, StoreKind};
use super::clock::Clock;
use super::counter::{admit_first, CounterEntry};
use super::decision::Decision;
use super::key::CounterKey;
use super::policy::RateLimitConfig;
use super::sweeper::{CounterTable, ExpirySweeper};
use crate::error::StoreError;

/// Counter store that keeps every window in a process-local table.
///
/// Counts are per process: two instances behind a load balancer each admit
/// the full quota. Use the Redis store when the deployment spans processes.
///
/// Lookup-and-mutate for a key runs under that key's shard write lock, so
/// concurrent requests for the same key are serialized and the last slot in
/// a window is handed out exactly once.
pub struct LocalStore {
    /// Counter entries indexed by serialized counter key
    table: Arc<CounterTable>,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<ExpirySweeper>>,
}

impl LocalStore {
    /// Create the store and start its expiry sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(clock: Arc<dyn Clock>, sweep_interval: Duration) -> Self {
        let table = Arc::new(CounterTable::new());
        let sweeper = ExpirySweeper::spawn(&table, clock.clone(), sweep_interval);

        Self {
            table,
            clock,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Count a request and decide whether it passes.
    pub fn check_now(&self, key: &CounterKey, config: &RateLimitConfig) -> Decision {
        let now_ms = self.clock.now_ms();
        let table_key = key.to_string_key();

        trace!(key = %table_key, "Checking local rate limit");

        let decision = match self.table.entry(table_key) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                occupied.get_mut().admit(now_ms, config)
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let (entry, decision) = admit_first(now_ms, config);
                vacant.insert(entry);
                decision
            }
        };

        if !decision.allowed {
            debug!(
                key = %key,
                limit = decision.limit,
                retry_after_secs = ?decision.retry_after_secs,
                "Local rate limit exceeded"
            );
        }

        decision
    }

    /// Snapshot of the entry for a key, if one is stored.
    pub fn entry(&self, key: &CounterKey) -> Option<CounterEntry> {
        self.table.get(&key.to_string_key()).map(|e| *e)
    }

    /// Number of stored windows, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Stop the sweeper. Checks keep working afterwards.
    pub async fn stop_sweeper(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }
}

#[async_trait]
impl CounterStore for LocalStore {
    async fn check(
        &self,
        key: &CounterKey,
        config: &RateLimitConfig,
    ) -> Result<Decision, StoreError> {
        Ok(self.check_now(key, config))
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }

    async fn shutdown(&self) {
        self.stop_sweeper().await;
    }
}
