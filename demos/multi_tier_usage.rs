//! Two nodes sharing one Redis instance, demonstrating cross-node
//! invalidation: node A writes, node B's L1 copy is evicted once the
//! channel delivers the EVICT event.
//!
//! Run with: cargo run --example multi_tier_usage

use cachebroker::{BrokerConfig, CacheManager};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = BrokerConfig::default();
    let node_a = CacheManager::init(config.clone(), None).await?;
    let node_b = CacheManager::init(config, None).await?;

    // Warm node B's L1 so there is something to invalidate.
    node_b.put("users", "u1", &"stale-on-b").await?;
    let _: Option<String> = node_b.get("users", "u1").await?;
    assert!(node_b.get_l1("users", "u1").is_some());

    node_a.put("users", "u1", &"fresh-from-a").await?;

    // Give the subscriber a moment to receive and apply the EVICT.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(node_b.get_l1("users", "u1").is_none());
    let value: Option<String> = node_b.get("users", "u1").await?;
    println!("node B now reads through to L2: {value:?}");

    node_a.shutdown().await?;
    node_b.shutdown().await?;
    Ok(())
}
