//! Basic usage: put, get, and read-through with a loader.
//!
//! Run with: cargo run --example basic_usage

use cachebroker::{BrokerConfig, CacheManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let manager = CacheManager::init(BrokerConfig::default(), None).await?;

    let user = serde_json::json!({"id": 1, "name": "Alice", "role": "admin"});
    manager.put("users", "u1", &user).await?;

    let cached: Option<serde_json::Value> = manager.get("users", "u1").await?;
    println!("cached value: {cached:?}");

    let loaded: serde_json::Value = manager
        .get_with_loader("users", "u2", || async {
            Ok(serde_json::json!({"id": 2, "name": "Bob"}))
        })
        .await?;
    println!("loaded via read-through: {loaded}");

    manager.evict("users", &["u1".to_string()]).await?;
    let gone: Option<serde_json::Value> = manager.get("users", "u1").await?;
    assert!(gone.is_none());

    manager.shutdown().await?;
    Ok(())
}
