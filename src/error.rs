//! Error kinds for the cache broker.
//!
//! One enum covers every failure mode named in the broker's error policy:
//! reads degrade to a miss on `L2Unavailable`, writes surface it; a channel
//! outage is logged and swallowed by the caller (the manager never returns
//! `ChannelUnavailable` from a public write path, it only logs it); loader
//! failures and bad region names always propagate.

use thiserror::Error;

/// Errors surfaced by the cache broker's public API.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The codec failed to encode or decode a value.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The L2 (remote) tier could not be reached or returned a protocol error.
    #[error("L2 unavailable: {0}")]
    L2Unavailable(String),

    /// The invalidation channel could not publish or deliver a message.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// A caller-supplied loader failed.
    #[error("loader failed: {0}")]
    Loader(#[source] anyhow::Error),

    /// The region name was empty or reserved.
    #[error("bad region: {0}")]
    BadRegion(String),

    /// The manager has begun (or finished) shutting down.
    #[error("manager is shutting down")]
    ShuttingDown,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::L2Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the broker.
pub type Result<T> = std::result::Result<T, CacheError>;
