//! `generic` L2 layout: one Redis key per entry, `"<namespace>:<region>:<key>"`.
//!
//! TTL is native Redis per-key expiration, so this is the only layout the
//! manager's per-call TTL override actually affects.

use super::{namespaced, L2Engine};
use crate::error::Result;
use crate::region::Region;
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

pub struct GenericLayout {
    conn: ConnectionManager,
    namespace: String,
}

impl GenericLayout {
    #[must_use]
    pub fn new(conn: ConnectionManager, namespace: String) -> Self {
        Self { conn, namespace }
    }

    fn key(&self, region: &str, key: &str) -> String {
        namespaced(&self.namespace, region, Some(key))
    }

    fn pattern(&self, region: &str) -> String {
        format!("{}*", namespaced(&self.namespace, region, Some("")))
    }
}

#[async_trait]
impl L2Engine for GenericLayout {
    async fn get(&self, region: &Region, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(&region.name, key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn put(
        &self,
        region: &Region,
        key: &str,
        value: Bytes,
        ttl_override: Option<u64>,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let ttl = ttl_override.unwrap_or(region.l2_ttl_secs);
        let name = self.key(&region.name, key);
        if ttl > 0 {
            let _: () = conn.set_ex(name, value.to_vec(), ttl).await?;
        } else {
            let _: () = conn.set(name, value.to_vec()).await?;
        }
        Ok(())
    }

    async fn put_if_absent(
        &self,
        region: &Region,
        key: &str,
        value: Bytes,
    ) -> Result<Option<Bytes>> {
        let mut conn = self.conn.clone();
        let name = self.key(&region.name, key);
        // SET key value NX GET is atomic: it returns the previous value (or
        // nil if none existed) whether or not the set actually happened.
        let mut cmd = redis::cmd("SET");
        cmd.arg(&name).arg(value.to_vec()).arg("NX").arg("GET");
        if region.l2_ttl_secs > 0 {
            cmd.arg("EX").arg(region.l2_ttl_secs);
        }
        let previous: Option<Vec<u8>> = cmd.query_async(&mut conn).await?;
        Ok(previous.map(Bytes::from))
    }

    async fn incr(&self, region: &Region, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(self.key(&region.name, key), delta).await?;
        Ok(value)
    }

    async fn evict(&self, region: &Region, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let names: Vec<String> = keys.iter().map(|k| self.key(&region.name, k)).collect();
        let _: i64 = conn.del(names).await?;
        Ok(())
    }

    async fn clear(&self, region: &Region) -> Result<()> {
        let keys = self.keys(region).await?;
        self.evict(region, &keys).await
    }

    async fn keys(&self, region: &Region) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let prefix_len = namespaced(&self.namespace, &region.name, Some("")).len();
        let pattern = self.pattern(&region.name);
        let mut cursor: u64 = 0;
        let mut out = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            for name in batch {
                if let Some(stripped) = name.get(prefix_len..) {
                    out.push(stripped.to_string());
                }
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(out)
    }
}
