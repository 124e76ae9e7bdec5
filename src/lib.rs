//! Two-level cache broker.
//!
//! Combines a fast in-process near cache (L1, `moka`) with a shared
//! remote cache (L2, Redis) behind one API, and keeps multiple
//! application nodes coherent by broadcasting invalidation events over a
//! Redis Pub/Sub channel. Callers look up objects by a `(region, key)`
//! pair; [`CacheManager::get`] returns the L1 value if present, otherwise
//! loads from L2, populates L1, and returns. Writes update both tiers and
//! publish an invalidation so peers evict their L1 entry.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use cachebroker::{BrokerConfig, CacheManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = CacheManager::init(BrokerConfig::default(), None).await?;
//!
//!     manager.put("users", "u1", &serde_json::json!({"name": "ada"})).await?;
//!     let value: Option<serde_json::Value> = manager.get("users", "u1").await?;
//!     println!("{value:?}");
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! get(region,key) -> L1 hit? return
//!                  -> L2 hit? populate L1, return
//!                  -> (with loader) call loader, store L2+L1, publish EVICT
//!
//! put/evict/clear  -> L2 first, then L1, then publish invalidation
//! ```
//!
//! The core is three collaborating pieces: the [`l1`] region engine (bounded,
//! TTL-aware in-memory maps with an eviction listener), the [`l2`] region
//! engine (two Redis layouts — `generic` keys and `hash` fields — with
//! different TTL semantics), and the [`channel`] invalidation protocol that
//! keeps them coherent across nodes. [`CacheManager`] is the façade over all
//! three; [`facade::CacheFacade`] is a thinner convenience layer on top for
//! callers with non-string keys.

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod l1;
pub mod l2;
pub mod manager;
pub mod region;

pub use codec::{decode, decode_value, encode, encode_value, CacheValue};
pub use config::{BrokerConfig, RegionConfig};
pub use error::{CacheError, Result};
pub use facade::{CacheFacade, ToCacheKey};
pub use l1::{EvictionListener, EvictionReason};
pub use manager::CacheManager;
pub use region::{L2Layout, Region};

pub use async_trait::async_trait;
