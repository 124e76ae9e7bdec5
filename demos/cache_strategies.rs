//! Per-region policy: capacity-bounded regions, TTL-bounded regions, and
//! per-call TTL overrides on the `generic` L2 layout.
//!
//! Run with: cargo run --example cache_strategies

use cachebroker::config::RegionConfig;
use cachebroker::{BrokerConfig, CacheManager, L2Layout};
use std::collections::HashMap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut regions = HashMap::new();
    regions.insert(
        "sessions".to_string(),
        RegionConfig {
            max_entries: Some(2),
            l1_ttl_secs: Some(10),
            l2_ttl_secs: Some(60),
            layout: Some(L2Layout::Hash),
        },
    );

    let config = BrokerConfig {
        regions,
        ..BrokerConfig::default()
    };
    let manager = CacheManager::init(config, None).await?;

    // "sessions" uses the hash layout with a bounded, short-lived L1.
    manager.put("sessions", "s1", &"token-a").await?;
    manager.put("sessions", "s2", &"token-b").await?;
    manager.put("sessions", "s3", &"token-c").await?;
    println!("sessions L1 keys (capacity 2): {:?}", manager.keys_l1("sessions"));

    // Any other region falls back to the broker's defaults (generic
    // layout) and accepts a one-off TTL override per call.
    manager
        .put_with_ttl("reports", "daily", &"report-bytes", Some(30))
        .await?;

    manager.shutdown().await?;
    Ok(())
}
