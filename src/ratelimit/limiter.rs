//! Admission decisions for a caller and a tier.

use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, trace, warn};

use super::backend::{CounterStore, StoreKind};
use super::clock::{Clock, SystemClock};
use super::decision::{retry_after_secs, Decision};
use super::distributed::{RedisStore, RedisStoreConfig};
use super::identifier::resolve_identifier;
use super::key::CounterKey;
use super::local::LocalStore;
use super::policy::{FailurePolicy, PolicyCatalogue, RateLimitConfig, Tier};
use crate::config::RateLimitingConfig;
use crate::error::{Result, StoreError};

/// The rate limiter that route handlers consult before doing work.
///
/// It pairs the policy catalogue with whichever counter store was selected
/// at startup. Callers never learn which store is active.
pub struct RateLimiter {
    catalogue: PolicyCatalogue,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter over an explicit store.
    pub fn new(
        catalogue: PolicyCatalogue,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalogue,
            store,
            clock,
        }
    }

    /// A rate limiter over an in-process store with the standard catalogue.
    ///
    /// Must be called from within a tokio runtime.
    pub fn local(sweep_interval: Duration) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let store = LocalStore::start(clock.clone(), sweep_interval);
        Self::new(PolicyCatalogue::standard(), Arc::new(store), clock)
    }

    /// Select the store from configuration.
    ///
    /// A configured Redis URL selects the distributed store and a failed
    /// initial connection is an error. Without one, the local store is used.
    pub async fn from_config(config: &RateLimitingConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        let store: Arc<dyn CounterStore> = match config.redis_url.as_deref() {
            Some(url) if config.is_distributed() => {
                let store_config = RedisStoreConfig {
                    key_prefix: config.redis_key_prefix.clone(),
                    op_timeout: config.redis_timeout(),
                };
                Arc::new(RedisStore::connect(url, store_config, clock.clone()).await?)
            }
            _ => Arc::new(LocalStore::start(clock.clone(), config.sweep_interval())),
        };

        info!(store = ?store.kind(), "Rate limiter initialized");

        Ok(Self::new(PolicyCatalogue::standard(), store, clock))
    }

    /// Decide whether `identifier` may perform an operation of class `tier`.
    pub async fn evaluate(&self, identifier: &str, tier: Tier) -> Decision {
        let config = self.catalogue.get(tier);
        let key = CounterKey::new(identifier, tier);

        trace!(key = %key, "Evaluating rate limit");

        match self.store.check(&key, config).await {
            Ok(decision) => decision,
            Err(err) => self.on_store_failure(&key, config, err),
        }
    }

    /// Like [`RateLimiter::evaluate`] for a tier given by name.
    ///
    /// A name outside the catalogue is an error, never an implicit decision.
    pub async fn evaluate_named(&self, identifier: &str, tier_name: &str) -> Result<Decision> {
        let (tier, _) = self.catalogue.lookup(tier_name)?;
        Ok(self.evaluate(identifier, tier).await)
    }

    /// Resolve the caller from request headers and evaluate.
    pub async fn evaluate_request(&self, headers: &HeaderMap, tier: Tier) -> Decision {
        let identifier = resolve_identifier(headers);
        self.evaluate(&identifier, tier).await
    }

    fn on_store_failure(
        &self,
        key: &CounterKey,
        config: &RateLimitConfig,
        err: StoreError,
    ) -> Decision {
        let now_ms = self.clock.now_ms();
        let reset_at_ms = now_ms.saturating_add(config.window_ms());
        let limit = config.max_requests();

        match key.tier.failure_policy() {
            FailurePolicy::Open => {
                warn!(
                    key = %key,
                    error = %err,
                    "Counter store unavailable, admitting request (fail open)"
                );
                Decision::allowed(limit, limit, reset_at_ms)
            }
            FailurePolicy::Closed => {
                error!(
                    key = %key,
                    error = %err,
                    "Counter store unavailable, rejecting request (fail closed)"
                );
                let retry_after = retry_after_secs(reset_at_ms, now_ms);
                Decision::denied(limit, reset_at_ms, retry_after, config.denial_message(retry_after))
            }
        }
    }

    pub fn catalogue(&self) -> &PolicyCatalogue {
        &self.catalogue
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    /// Stop background work owned by the store.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
