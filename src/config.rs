//! Broker configuration.
//!
//! Construction-time settings only; there is no file-format parsing here,
//! values are expected to arrive from whatever configuration layer the
//! embedding application already uses (env vars, a TOML/YAML loader, etc.).
//! Defaults mirror the broker's own defaults described alongside the region
//! registry.

use crate::region::L2Layout;
use std::collections::HashMap;

/// Per-region override. Any field left `None` falls back to the
/// [`BrokerConfig`] default of the same name.
#[derive(Debug, Clone, Default)]
pub struct RegionConfig {
    pub max_entries: Option<u64>,
    pub l1_ttl_secs: Option<u64>,
    pub l2_ttl_secs: Option<u64>,
    pub layout: Option<L2Layout>,
}

/// Top-level broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Prefix applied to every L2 key/hash name, isolating tenants that
    /// share one Redis instance.
    pub namespace: String,
    /// Default L2 layout for regions with no explicit override.
    pub default_layout: L2Layout,
    /// Default L1 capacity for regions with no explicit override; 0 = unbounded.
    pub default_max_entries: u64,
    /// Default L1 TTL in seconds for regions with no explicit override; 0 = infinite.
    pub default_l1_ttl_secs: u64,
    /// Default L2 TTL in seconds for regions with no explicit override; 0 = infinite.
    pub default_l2_ttl_secs: u64,
    /// Per-region overrides, keyed by region name.
    pub regions: HashMap<String, RegionConfig>,
    /// Redis Pub/Sub channel used for cross-node invalidation events.
    pub channel_name: String,
    /// Redis connection string for both L2 storage and the invalidation channel.
    pub redis_url: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            default_layout: L2Layout::Generic,
            default_max_entries: 10_000,
            default_l1_ttl_secs: 300,
            default_l2_ttl_secs: 3600,
            regions: HashMap::new(),
            channel_name: "cache:invalidate".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}
