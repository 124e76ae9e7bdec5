//! Region registry.
//!
//! A region is a named namespace with its own L1 capacity/TTL and L2 TTL
//! and layout. Regions are created lazily on first access and persist for
//! the lifetime of the manager; the registry is the single source of truth
//! other components consult to learn a region's policy.

use crate::config::RegionConfig;
use crate::error::{CacheError, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// The two L2 storage schemes. `Generic` supports TTL; `Hash` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum L2Layout {
    /// One remote key per entry: `"<namespace>:<region>:<key>"`.
    Generic,
    /// One remote hash per region, fields are keys: `"<namespace>:<region>"`.
    Hash,
}

/// Resolved policy for one region.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    /// L1 capacity; 0 = unbounded.
    pub max_entries: u64,
    /// L1 TTL in seconds; 0 = infinite.
    pub l1_ttl_secs: u64,
    /// L2 TTL in seconds; 0 = infinite. Only honoured by the `Generic` layout.
    pub l2_ttl_secs: u64,
    pub layout: L2Layout,
}

/// Lazily-populated region registry shared by the manager and both engines.
///
/// Region names must be non-empty UTF-8 and are not otherwise restricted,
/// except that they may not collide with the manager's reserved channel
/// bookkeeping name.
pub struct RegionRegistry {
    regions: DashMap<String, Arc<Region>>,
    default_max_entries: u64,
    default_l1_ttl_secs: u64,
    default_l2_ttl_secs: u64,
    default_layout: L2Layout,
    per_region_config: DashMap<String, RegionConfig>,
}

/// Region name reserved for the manager's own JOIN/QUIT bookkeeping; never a
/// valid user-supplied region.
pub const RESERVED_REGION_NAME: &str = "__cache_broker_channel__";

impl RegionRegistry {
    #[must_use]
    pub fn new(
        default_max_entries: u64,
        default_l1_ttl_secs: u64,
        default_l2_ttl_secs: u64,
        default_layout: L2Layout,
        configured: impl IntoIterator<Item = (String, RegionConfig)>,
    ) -> Self {
        let per_region_config = DashMap::new();
        for (name, cfg) in configured {
            per_region_config.insert(name, cfg);
        }
        Self {
            regions: DashMap::new(),
            default_max_entries,
            default_l1_ttl_secs,
            default_l2_ttl_secs,
            default_layout,
            per_region_config,
        }
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(CacheError::BadRegion("region name is empty".to_string()));
        }
        if name == RESERVED_REGION_NAME {
            return Err(CacheError::BadRegion(format!(
                "region name '{name}' is reserved"
            )));
        }
        Ok(())
    }

    /// Resolve (and lazily create) a region's policy.
    pub fn resolve(&self, name: &str) -> Result<Arc<Region>> {
        Self::validate_name(name)?;
        if let Some(region) = self.regions.get(name) {
            return Ok(Arc::clone(&region));
        }

        let cfg = self.per_region_config.get(name);
        let region = Arc::new(Region {
            name: name.to_string(),
            max_entries: cfg
                .as_ref()
                .and_then(|c| c.max_entries)
                .unwrap_or(self.default_max_entries),
            l1_ttl_secs: cfg
                .as_ref()
                .and_then(|c| c.l1_ttl_secs)
                .unwrap_or(self.default_l1_ttl_secs),
            l2_ttl_secs: cfg
                .as_ref()
                .and_then(|c| c.l2_ttl_secs)
                .unwrap_or(self.default_l2_ttl_secs),
            layout: cfg
                .as_ref()
                .and_then(|c| c.layout)
                .unwrap_or(self.default_layout),
        });

        self.regions
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&region));
        Ok(Arc::clone(
            self.regions
                .get(name)
                .as_deref()
                .expect("just inserted above"),
        ))
    }

    /// Snapshot of every region name seen so far.
    #[must_use]
    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_reserved_names() {
        let registry = RegionRegistry::new(0, 0, 0, L2Layout::Generic, []);
        assert!(registry.resolve("").is_err());
        assert!(registry.resolve(RESERVED_REGION_NAME).is_err());
    }

    #[test]
    fn lazily_creates_and_persists_regions() {
        let registry = RegionRegistry::new(100, 60, 300, L2Layout::Generic, []);
        assert!(registry.region_names().is_empty());

        let region = registry.resolve("users").expect("resolve");
        assert_eq!(region.max_entries, 100);
        assert_eq!(region.l1_ttl_secs, 60);
        assert_eq!(region.layout, L2Layout::Generic);

        assert_eq!(registry.region_names(), vec!["users".to_string()]);

        let again = registry.resolve("users").expect("resolve again");
        assert!(Arc::ptr_eq(&region, &again));
    }

    #[test]
    fn per_region_overrides_win_over_defaults() {
        let overrides = [(
            "sessions".to_string(),
            RegionConfig {
                max_entries: Some(5),
                l1_ttl_secs: None,
                l2_ttl_secs: Some(30),
                layout: Some(L2Layout::Hash),
            },
        )];
        let registry = RegionRegistry::new(100, 60, 300, L2Layout::Generic, overrides);
        let region = registry.resolve("sessions").expect("resolve");
        assert_eq!(region.max_entries, 5);
        assert_eq!(region.l1_ttl_secs, 60); // falls back to default
        assert_eq!(region.l2_ttl_secs, 30);
        assert_eq!(region.layout, L2Layout::Hash);
    }
}
