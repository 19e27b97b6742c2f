//! Counter store trait for abstracting local and distributed implementations.

use async_trait::async_trait;
use serde::Serialize;

use super::decision::Decision;
use super::key::CounterKey;
use super::policy::RateLimitConfig;
use crate::error::StoreError;

/// Which counter store variant is serving checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process table, counts are per process
    Local,
    /// Shared Redis counters, counts are global across processes
    Redis,
}

/// Trait for counter store implementations.
///
/// This trait abstracts over the in-process `LocalStore` and the Redis-backed
/// `RedisStore` so the `RateLimiter` can work with either. Both apply the
/// same fixed-window semantics; each call atomically counts the request (if
/// admitted) and reports the resulting decision.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Count a request for `key` under `config` and decide whether it passes.
    async fn check(&self, key: &CounterKey, config: &RateLimitConfig)
        -> Result<Decision, StoreError>;

    /// Which variant this is.
    fn kind(&self) -> StoreKind;

    /// Stop any background work owned by the store.
    async fn shutdown(&self) {}
}
