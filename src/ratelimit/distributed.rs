//! Distributed counter store backed by Redis.
//!
//! Every process instance talks to the same Redis, so two instances that
//! see the same caller within a window share one count. Each check runs as
//! a single Lua script, which Redis executes atomically; no local locking
//! is needed.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::backend::{CounterStore, StoreKind};
use super::clock::Clock;
use super::decision::{retry_after_secs, Decision};
use super::key::CounterKey;
use super::policy::RateLimitConfig;
use crate::error::StoreError;

/// Fixed-window check. Denied requests are not counted.
///
/// KEYS[1] counter key, ARGV[1] max requests, ARGV[2] window in ms.
/// Returns `{admitted, count, pttl}`.
const CHECK_SCRIPT: &str = r#"
local key = KEYS[1]
local max_requests = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])

local count = tonumber(redis.call("GET", key)) or 0
if count >= max_requests then
    local ttl = redis.call("PTTL", key)
    if ttl < 0 then
        redis.call("PEXPIRE", key, window_ms)
        ttl = window_ms
    end
    return {0, count, ttl}
end

count = redis.call("INCR", key)
local ttl = redis.call("PTTL", key)
if count == 1 or ttl < 0 then
    redis.call("PEXPIRE", key, window_ms)
    ttl = window_ms
end

return {1, count, ttl}
"#;

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Prefix for every key, joined with `:`
    pub key_prefix: String,
    /// Bound for a single round trip
    pub op_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "tollgate".to_string(),
            op_timeout: Duration::from_millis(250),
        }
    }
}

/// A counter store shared by every instance through Redis.
pub struct RedisStore {
    connection: ConnectionManager,
    script: Script,
    config: RedisStoreConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// The connection manager reconnects on its own after transient failures;
    /// only the initial connection is reported here.
    pub async fn connect(
        url: &str,
        config: RedisStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = tokio::time::timeout(config.op_timeout * 4, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(config.op_timeout * 4))??;

        info!(prefix = %config.key_prefix, "Connected to Redis counter store");

        Ok(Self::with_connection(connection, config, clock))
    }

    /// Build the store around an existing connection manager.
    pub fn with_connection(
        connection: ConnectionManager,
        config: RedisStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connection,
            script: Script::new(CHECK_SCRIPT),
            config,
            clock,
        }
    }

    /// The Redis key for a counter.
    pub fn redis_key(&self, key: &CounterKey) -> String {
        format!("{}:{}", self.config.key_prefix, key.to_string_key())
    }

    async fn invoke(
        &self,
        redis_key: &str,
        config: &RateLimitConfig,
    ) -> Result<(i64, u64, i64), StoreError> {
        let mut connection = self.connection.clone();
        let reply: Result<redis::RedisResult<(i64, u64, i64)>, _> = tokio::time::timeout(
            self.config.op_timeout,
            self.script
                .key(redis_key)
                .arg(config.max_requests())
                .arg(config.window_ms())
                .invoke_async(&mut connection),
        )
        .await;

        match reply {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.config.op_timeout)),
        }
    }
}

/// Turn a script reply into a decision.
fn decide(admitted: bool, count: u64, ttl_ms: i64, now_ms: u64, config: &RateLimitConfig) -> Decision {
    let limit = config.max_requests();
    let ttl_ms = u64::try_from(ttl_ms).unwrap_or(config.window_ms());
    let reset_at_ms = now_ms.saturating_add(ttl_ms);

    if admitted {
        Decision::allowed(limit, limit.saturating_sub(count), reset_at_ms)
    } else {
        let retry_after = retry_after_secs(reset_at_ms, now_ms);
        Decision::denied(limit, reset_at_ms, retry_after, config.denial_message(retry_after))
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn check(
        &self,
        key: &CounterKey,
        config: &RateLimitConfig,
    ) -> Result<Decision, StoreError> {
        let redis_key = self.redis_key(key);

        trace!(key = %redis_key, "Checking distributed rate limit");

        let (admitted, count, ttl_ms) = self.invoke(&redis_key, config).await?;
        let decision = decide(admitted == 1, count, ttl_ms, self.clock.now_ms(), config);

        if !decision.allowed {
            debug!(
                key = %redis_key,
                count,
                limit = decision.limit,
                "Distributed rate limit exceeded"
            );
        }

        Ok(decision)
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Redis
    }
}
