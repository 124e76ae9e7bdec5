//! `hash` L2 layout: one Redis hash per region, `"<namespace>:<region>"`,
//! fields are plain UTF-8 keys.
//!
//! Redis hash fields have no native per-entry expiry, so TTL is accepted
//! by the trait and silently ignored here. Keys are stored and returned as
//! plain strings, never re-encoded through the value codec; see DESIGN.md.

use super::{namespaced, L2Engine};
use crate::error::Result;
use crate::region::Region;
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

pub struct HashLayout {
    conn: ConnectionManager,
    namespace: String,
}

impl HashLayout {
    #[must_use]
    pub fn new(conn: ConnectionManager, namespace: String) -> Self {
        Self { conn, namespace }
    }

    fn hash_key(&self, region: &str) -> String {
        namespaced(&self.namespace, region, None)
    }
}

#[async_trait]
impl L2Engine for HashLayout {
    async fn get(&self, region: &Region, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.hget(self.hash_key(&region.name), key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(
        &self,
        region: &Region,
        key: &str,
        value: Bytes,
        _ttl_override: Option<u64>,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(self.hash_key(&region.name), key, value.to_vec())
            .await?;
        Ok(())
    }

    /// `HSETNX` is atomic at the single-field level, unlike the source's
    /// check-then-set; see DESIGN.md for the remaining, documented gap
    /// relative to `generic`'s atomic `SET NX GET`.
    async fn put_if_absent(
        &self,
        region: &Region,
        key: &str,
        value: Bytes,
    ) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let name = self.hash_key(&region.name);
        let set: bool = conn.hset_nx(&name, key, value.to_vec()).await?;
        if set {
            return Ok(None);
        }
        let existing: Option<Vec<u8>> = conn.hget(&name, key).await?;
        Ok(existing.map(Bytes::from))
    }

    async fn incr(&self, region: &Region, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn
            .hincr(self.hash_key(&region.name), key, delta)
            .await?;
        Ok(value)
    }

    async fn evict(&self, region: &Region, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: i64 = conn.hdel(self.hash_key(&region.name), keys).await?;
        Ok(())
    }

    async fn clear(&self, region: &Region) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(self.hash_key(&region.name)).await?;
        Ok(())
    }

    async fn keys(&self, region: &Region) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.hkeys(self.hash_key(&region.name)).await?;
        Ok(keys)
    }
}
