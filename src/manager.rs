//! The cache manager: region registry, L1/L2 coordination, and the
//! publish discipline that keeps peer nodes coherent.
//!
//! Every mutation follows the same order — L2 first, then L1, then
//! publish — so a process that dies mid-mutation still leaves peers able
//! to observe monotonic state through L2.

use crate::channel::{
    dispatch, decode_or_ignore, ChannelTransport, Effect, InvalidationEvent, RedisChannelTransport,
};
use crate::codec::{decode_value, encode, encode_value, CacheValue};
use crate::config::BrokerConfig;
use crate::error::{CacheError, Result};
use crate::l1::{EvictionListener, EvictionRecord, L1Engine, MokaL1Engine};
use crate::l2::{L2Backend, L2Engine};
use crate::region::RegionRegistry;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// RAII cleanup for the single-flight loader-lock map: the entry is
/// removed even if the loader panics or returns early.
struct InFlightGuard<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

fn in_flight_key(region: &str, key: &str) -> String {
    format!("{region}\u{0}{key}")
}

pub struct CacheManager {
    registry: RegionRegistry,
    l1: Arc<dyn L1Engine>,
    l2: L2Backend,
    transport: Arc<dyn ChannelTransport>,
    sender_id: String,
    peers: Arc<DashSet<String>>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    shutting_down: AtomicBool,
    _subscriber_task: tokio::task::JoinHandle<()>,
    _eviction_task: tokio::task::JoinHandle<()>,
}

impl CacheManager {
    /// Build the manager from config and start its background tasks:
    /// the eviction-listener drain and the invalidation-channel
    /// subscriber. Publishes a single JOIN before returning.
    pub async fn init(
        config: BrokerConfig,
        listener: Option<Arc<dyn EvictionListener>>,
    ) -> Result<Arc<Self>> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(CacheError::from)?;
        let sender_id = Uuid::new_v4().to_string();

        let (evict_tx, mut evict_rx) = mpsc::unbounded_channel::<EvictionRecord>();
        let l1: Arc<dyn L1Engine> = Arc::new(MokaL1Engine::new(evict_tx));
        let l2 = L2Backend::new(conn, config.namespace.clone());
        let registry = RegionRegistry::new(
            config.default_max_entries,
            config.default_l1_ttl_secs,
            config.default_l2_ttl_secs,
            config.default_layout,
            config.regions.clone(),
        );
        let transport: Arc<dyn ChannelTransport> =
            Arc::new(RedisChannelTransport::new(client, config.channel_name.clone()).await?);
        let peers = Arc::new(DashSet::new());

        let eviction_task = tokio::spawn(async move {
            while let Some(record) = evict_rx.recv().await {
                if let Some(listener) = &listener {
                    listener.on_evict(&record.region, &record.key, record.reason);
                }
            }
        });

        let subscriber_task = {
            let l1 = Arc::clone(&l1);
            let sender_id = sender_id.clone();
            let peers = Arc::clone(&peers);
            transport.subscribe(Arc::new(move |bytes: Vec<u8>| {
                let Some(event) = decode_or_ignore(&bytes) else {
                    return;
                };
                match dispatch(&event, &sender_id, l1.as_ref()) {
                    Effect::Joined(id) => {
                        peers.insert(id);
                    }
                    Effect::Quit(id) => {
                        peers.remove(&id);
                    }
                    Effect::SelfEcho | Effect::Applied => {}
                }
            }))
        };

        let manager = Arc::new(Self {
            registry,
            l1,
            l2,
            transport,
            sender_id: sender_id.clone(),
            peers,
            in_flight: DashMap::new(),
            shutting_down: AtomicBool::new(false),
            _subscriber_task: subscriber_task,
            _eviction_task: eviction_task,
        });

        manager.publish(InvalidationEvent::join(sender_id)).await;
        Ok(manager)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(CacheError::ShuttingDown);
        }
        Ok(())
    }

    async fn publish(&self, event: InvalidationEvent) {
        match event.encode() {
            Ok(bytes) => {
                if let Err(e) = self.transport.publish(bytes).await {
                    warn!(error = %e, "invalidation publish failed, operation still applied locally");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode invalidation event"),
        }
    }

    async fn publish_evict(&self, region: &str, keys: &[String]) {
        self.publish(InvalidationEvent::evict(
            region.to_string(),
            keys.to_vec(),
            self.sender_id.clone(),
        ))
        .await;
    }

    async fn publish_clear(&self, region: &str) {
        self.publish(InvalidationEvent::clear(region.to_string(), self.sender_id.clone()))
            .await;
    }

    /// L1 on hit; L2 on miss, populating L1 but never publishing. Never
    /// invokes a loader.
    pub async fn get<T: DeserializeOwned>(&self, region: &str, key: &str) -> Result<Option<T>> {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;

        if let Some(bytes) = self.l1.get(region, key) {
            match decode_value::<T>(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(%region, %key, error = %e, "poisoned L1 entry, evicting");
                    self.l1.evict(region, &[key.to_string()]);
                    return Ok(None);
                }
            }
        }

        let l2 = self.l2.for_region(&region_arc);
        let bytes = match l2.get(&region_arc, key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%region, %key, error = %e, "L2 unavailable on read, degrading to miss");
                return Ok(None);
            }
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        match decode_value::<T>(&bytes) {
            Ok(Some(value)) => {
                self.l1.put(&region_arc, key, bytes);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(%region, %key, error = %e, "poisoned L2 entry, evicting");
                let _ = l2.evict(&region_arc, &[key.to_string()]).await;
                Ok(None)
            }
        }
    }

    /// As [`get`](Self::get), then on a total miss calls `loader`, stores
    /// the result in L1+L2, and publishes EVICT so peers discard any
    /// stale L1 copy. Concurrent callers for the same (region,key) that
    /// all miss coalesce onto a single loader invocation.
    pub async fn get_with_loader<T, F, Fut>(
        &self,
        region: &str,
        key: &str,
        loader: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send,
    {
        self.ensure_running()?;
        if let Some(value) = self.get::<T>(region, key).await? {
            return Ok(value);
        }

        let guard_key = in_flight_key(region, key);
        let lock = self
            .in_flight
            .entry(guard_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _cleanup = InFlightGuard {
            map: &self.in_flight,
            key: guard_key,
        };
        let _permit = lock.lock().await;

        // Another waiter may have populated L1 while we queued for the lock.
        if let Some(value) = self.get::<T>(region, key).await? {
            return Ok(value);
        }

        let value = loader().await.map_err(CacheError::Loader)?;
        let region_arc = self.registry.resolve(region)?;
        let bytes = Bytes::from(encode_value(&value)?);
        self.l2
            .for_region(&region_arc)
            .put(&region_arc, key, bytes.clone(), None)
            .await?;
        self.l1.put(&region_arc, key, bytes);
        self.publish_evict(region, &[key.to_string()]).await;
        Ok(value)
    }

    /// Store in L2 then L1, then publish EVICT. A value that encodes to
    /// the codec's `Null` tag is treated as an eviction request instead
    /// of a store, per the codec's contract.
    pub async fn put<T: Serialize>(&self, region: &str, key: &str, value: &T) -> Result<()> {
        self.put_with_ttl(region, key, value, None).await
    }

    /// As [`put`](Self::put), with a per-call TTL overriding the region's
    /// default on the `generic` L2 layout; silently ignored on `hash`.
    pub async fn put_with_ttl<T: Serialize>(
        &self,
        region: &str,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        self.ensure_running()?;
        let encoded = encode_value(value)?;
        if encoded == encode(&CacheValue::Null) {
            return self.evict(region, &[key.to_string()]).await;
        }

        let region_arc = self.registry.resolve(region)?;
        let bytes = Bytes::from(encoded);
        self.l2
            .for_region(&region_arc)
            .put(&region_arc, key, bytes.clone(), ttl_secs)
            .await?;
        self.l1.put(&region_arc, key, bytes);
        self.publish_evict(region, &[key.to_string()]).await;
        Ok(())
    }

    /// Atomically store only if absent; returns the previous value, if any.
    pub async fn put_if_absent<T>(&self, region: &str, key: &str, value: &T) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;
        let bytes = Bytes::from(encode_value(value)?);
        let previous = self
            .l2
            .for_region(&region_arc)
            .put_if_absent(&region_arc, key, bytes.clone())
            .await?;
        match previous {
            None => {
                self.l1.put(&region_arc, key, bytes);
                self.publish_evict(region, &[key.to_string()]).await;
                Ok(None)
            }
            Some(previous_bytes) => Ok(decode_value(&previous_bytes)?),
        }
    }

    /// Atomically add `delta` to the counter at (region,key), invalidating
    /// any cached copy. Returns the new value.
    pub async fn incr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        self.counter_op(region, key, delta).await
    }

    /// As [`incr`](Self::incr) with the delta negated.
    pub async fn decr(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        self.counter_op(region, key, -delta).await
    }

    async fn counter_op(&self, region: &str, key: &str, delta: i64) -> Result<i64> {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;
        let value = self
            .l2
            .for_region(&region_arc)
            .incr(&region_arc, key, delta)
            .await?;
        self.l1.evict(region, &[key.to_string()]);
        self.publish_evict(region, &[key.to_string()]).await;
        Ok(value)
    }

    /// Remove from L2 then L1, then publish EVICT.
    pub async fn evict(&self, region: &str, keys: &[String]) -> Result<()> {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;
        self.l2.for_region(&region_arc).evict(&region_arc, keys).await?;
        self.l1.evict(region, keys);
        self.publish_evict(region, keys).await;
        Ok(())
    }

    /// Clear L2 then L1, then publish CLEAR.
    pub async fn clear(&self, region: &str) -> Result<()> {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;
        self.l2.for_region(&region_arc).clear(&region_arc).await?;
        self.l1.clear(region);
        self.publish_clear(region).await;
        Ok(())
    }

    /// Snapshot of every region name seen so far.
    #[must_use]
    pub fn regions(&self) -> Vec<String> {
        self.registry.region_names()
    }

    /// L2's view of a region's keys (the tier of record).
    pub async fn keys(&self, region: &str) -> Result<Vec<String>> {
        self.ensure_running()?;
        let region_arc = self.registry.resolve(region)?;
        self.l2.for_region(&region_arc).keys(&region_arc).await
    }

    /// L1's view of a region's keys, for tests/diagnostics.
    #[must_use]
    pub fn keys_l1(&self, region: &str) -> Vec<String> {
        self.l1.keys(region)
    }

    /// Raw L1 lookup bypassing L2, for tests/diagnostics: inspect this to
    /// assert a peer's near cache was invalidated without going through L2.
    #[must_use]
    pub fn get_l1(&self, region: &str, key: &str) -> Option<Bytes> {
        self.l1.get(region, key)
    }

    /// Sender ids this node has seen JOIN without a matching QUIT.
    #[must_use]
    pub fn known_peers(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.clone()).collect()
    }

    #[must_use]
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Idempotent: waits for in-flight loaders to drain, publishes a
    /// single QUIT, then closes the channel.
    pub async fn shutdown(self: &Arc<Self>) -> Result<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        while !self.in_flight.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.publish(InvalidationEvent::quit(self.sender_id.clone())).await;
        self.transport.close().await;
        Ok(())
    }
}
