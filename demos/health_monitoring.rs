//! Wiring an eviction listener to observe every reason an entry leaves L1:
//! capacity pressure, explicit eviction, TTL expiry, or a peer's
//! invalidation arriving over the channel.
//!
//! Run with: cargo run --example health_monitoring

use cachebroker::config::RegionConfig;
use cachebroker::{BrokerConfig, CacheManager, EvictionListener, EvictionReason};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

struct LoggingListener;

impl EvictionListener for LoggingListener {
    fn on_evict(&self, region: &str, key: &str, reason: EvictionReason) {
        info!(region, key, ?reason, "L1 entry evicted");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut regions = HashMap::new();
    regions.insert(
        "bounded".to_string(),
        RegionConfig {
            max_entries: Some(2),
            ..RegionConfig::default()
        },
    );
    let config = BrokerConfig {
        regions,
        ..BrokerConfig::default()
    };

    let manager = CacheManager::init(config, Some(Arc::new(LoggingListener))).await?;

    manager.put("bounded", "k1", &1).await?;
    manager.put("bounded", "k2", &2).await?;
    manager.put("bounded", "k3", &3).await?; // k1 should be reported CAPACITY

    manager.evict("bounded", &["k2".to_string()]).await?; // EXPLICIT

    manager.shutdown().await?;
    Ok(())
}
