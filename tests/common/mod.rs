//! Shared integration-test infrastructure: Redis connection helpers,
//! unique key/region naming, and test data generators. Every test in this
//! crate connects to `REDIS_URL` (default `redis://127.0.0.1:6379`),
//! exactly as the cache manager itself does.

use cachebroker::{BrokerConfig, CacheManager};
use std::sync::Arc;

/// Get Redis URL from environment or use the default.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// A region name unique to this test run, so concurrent test binaries
/// never collide on the same shared Redis instance.
pub fn unique_region(prefix: &str) -> String {
    format!("{prefix}_{}", rand::random::<u32>())
}

/// Build a `BrokerConfig` pointed at the test Redis instance, with a
/// per-test-run namespace so namespace isolation is exercised by default
/// rather than by accident.
pub fn test_config() -> BrokerConfig {
    BrokerConfig {
        redis_url: redis_url(),
        namespace: format!("test{}", rand::random::<u32>()),
        channel_name: format!("test:invalidate:{}", rand::random::<u32>()),
        ..BrokerConfig::default()
    }
}

/// Two managers sharing the same config (and hence the same namespace and
/// channel) — the two-node setup most cross-node scenarios call for.
pub async fn init_pair() -> (Arc<CacheManager>, Arc<CacheManager>) {
    let config = test_config();
    let a = CacheManager::init(config.clone(), None)
        .await
        .expect("init node A");
    let b = CacheManager::init(config, None).await.expect("init node B");
    (a, b)
}

pub async fn init_single() -> Arc<CacheManager> {
    CacheManager::init(test_config(), None)
        .await
        .expect("init cache manager")
}

/// Poll `condition` until it's true or `timeout_ms` elapses.
pub async fn wait_for<F: FnMut() -> bool>(mut condition: F, timeout_ms: u64) -> bool {
    use tokio::time::{sleep, Duration, Instant};

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

pub mod test_data {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct User {
        pub id: u64,
        pub name: String,
        pub email: String,
    }

    impl User {
        pub fn new(id: u64) -> Self {
            Self {
                id,
                name: format!("User {id}"),
                email: format!("user{id}@example.com"),
            }
        }
    }
}
