//! Background eviction of expired local counters.
//!
//! The sweeper only bounds memory. `LocalStore::check` already treats an
//! expired entry as absent, so losing a race with a check just delays the
//! eviction by one tick.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::clock::Clock;
use super::counter::CounterEntry;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Counter table shared between the local store and its sweeper.
pub type CounterTable = DashMap<String, CounterEntry>;

/// Handle to a running sweep task.
///
/// The task stops when [`ExpirySweeper::stop`] is called, when the handle is
/// dropped, or when the table it sweeps has been dropped.
#[derive(Debug)]
pub struct ExpirySweeper {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(table: &Arc<CounterTable>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let table: Weak<CounterTable> = Arc::downgrade(table);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(table) = table.upgrade() else {
                            trace!("Counter table dropped, stopping sweeper");
                            break;
                        };
                        sweep_once(&table, clock.now_ms());
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Expiry sweeper stopped");
        });

        debug!(interval = ?interval, "Expiry sweeper started");

        Self {
            stop_tx,
            task: Some(task),
        }
    }

    /// Signal the sweep loop to stop and wait for it to exit.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Remove every entry whose window has closed. Returns the eviction count.
pub fn sweep_once(table: &CounterTable, now_ms: u64) -> usize {
    let before = table.len();
    table.retain(|_, entry| !entry.is_expired(now_ms));
    let evicted = before.saturating_sub(table.len());

    if evicted > 0 {
        debug!(evicted, remaining = table.len(), "Swept expired rate limit windows");
    }

    evicted
}
