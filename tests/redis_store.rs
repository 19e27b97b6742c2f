//! Redis store checks against a live server.
//!
//! Set `REDIS_URL` (e.g. `redis://127.0.0.1:6379/`) to run these; they are
//! skipped otherwise.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_test::assert_ok;

use tollgate::ratelimit::{
    Clock, CounterKey, CounterStore, RateLimitConfig, RedisStore, RedisStoreConfig, SystemClock,
    Tier,
};

async fn store(prefix: &str) -> Option<RedisStore> {
    let url = std::env::var("REDIS_URL").ok()?;
    let config = RedisStoreConfig {
        key_prefix: format!("tollgate-test-{}-{}", prefix, std::process::id()),
        op_timeout: Duration::from_secs(2),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    Some(RedisStore::connect(&url, config, clock).await.unwrap())
}

fn config(max: u64, window_ms: u64) -> RateLimitConfig {
    RateLimitConfig::new(max, Duration::from_millis(window_ms)).unwrap()
}

#[tokio::test]
async fn test_fixed_window_matches_local_semantics() {
    let Some(store) = store("window").await else {
        return;
    };
    let key = CounterKey::new("X", Tier::Api);
    let config = config(3, 1000);

    let mut remaining = Vec::new();
    for _ in 0..3 {
        let decision = assert_ok!(store.check(&key, &config).await);
        assert!(decision.allowed);
        remaining.push(decision.remaining);
    }
    assert_eq!(remaining, vec![2, 1, 0]);

    let denied = assert_ok!(store.check(&key, &config).await);
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    assert_eq!(denied.retry_after_secs, Some(1));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let fresh = assert_ok!(store.check(&key, &config).await);
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
}

#[tokio::test]
async fn test_two_instances_share_one_count() {
    let (Some(first), Some(second)) = (store("shared").await, store("shared").await) else {
        return;
    };
    let key = CounterKey::new("shared-caller", Tier::Booking);
    let config = config(4, 60_000);

    for _ in 0..2 {
        assert!(assert_ok!(first.check(&key, &config).await).allowed);
        assert!(assert_ok!(second.check(&key, &config).await).allowed);
    }

    assert!(!assert_ok!(first.check(&key, &config).await).allowed);
    assert!(!assert_ok!(second.check(&key, &config).await).allowed);
}

#[tokio::test]
async fn test_concurrent_checks_admit_exactly_quota() {
    let Some(store) = store("concurrent").await else {
        return;
    };
    let store = Arc::new(store);
    let key = CounterKey::new("racer", Tier::Financial);
    let config = Arc::new(config(5, 60_000));

    let checks = (0..20).map(|_| {
        let store = store.clone();
        let key = key.clone();
        let config = config.clone();
        async move { store.check(&key, &config).await.unwrap().allowed }
    });

    let admitted = join_all(checks).await.into_iter().filter(|a| *a).count();
    assert_eq!(admitted, 5);
}
