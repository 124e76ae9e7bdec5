//! Public façade: a thin adapter over [`CacheManager`] that accepts keys
//! of any scalar type and coerces them to the manager's string keys.
//! Not part of the coherence core — no business logic lives here.

use crate::error::Result;
use crate::manager::CacheManager;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Deterministic key coercion: integers in base 10, booleans as
/// `true`/`false`, byte arrays base64-encoded.
pub trait ToCacheKey {
    fn to_cache_key(&self) -> String;
}

impl ToCacheKey for str {
    fn to_cache_key(&self) -> String {
        self.to_string()
    }
}

impl ToCacheKey for String {
    fn to_cache_key(&self) -> String {
        self.clone()
    }
}

impl ToCacheKey for bool {
    fn to_cache_key(&self) -> String {
        if *self { "true".to_string() } else { "false".to_string() }
    }
}

impl ToCacheKey for [u8] {
    fn to_cache_key(&self) -> String {
        BASE64.encode(self)
    }
}

macro_rules! impl_to_cache_key_for_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl ToCacheKey for $t {
                fn to_cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

impl_to_cache_key_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Uniform entry point used by callers that would rather pass a number,
/// bool, or byte slice than format a string key themselves.
pub struct CacheFacade {
    manager: Arc<CacheManager>,
}

impl CacheFacade {
    #[must_use]
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<CacheManager> {
        &self.manager
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        region: &str,
        key: &(impl ToCacheKey + ?Sized),
    ) -> Result<Option<T>> {
        self.manager.get(region, &key.to_cache_key()).await
    }

    pub async fn put<T: Serialize>(
        &self,
        region: &str,
        key: &(impl ToCacheKey + ?Sized),
        value: &T,
    ) -> Result<()> {
        self.manager.put(region, &key.to_cache_key(), value).await
    }

    pub async fn put_with_ttl<T: Serialize>(
        &self,
        region: &str,
        key: &(impl ToCacheKey + ?Sized),
        value: &T,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        self.manager
            .put_with_ttl(region, &key.to_cache_key(), value, ttl_secs)
            .await
    }

    pub async fn evict(&self, region: &str, key: &(impl ToCacheKey + ?Sized)) -> Result<()> {
        self.manager.evict(region, &[key.to_cache_key()]).await
    }

    pub async fn clear(&self, region: &str) -> Result<()> {
        self.manager.clear(region).await
    }
}
