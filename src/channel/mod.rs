//! Invalidation channel: transport (pub/sub plumbing) plus protocol
//! (event shape and dispatch).

pub mod protocol;
pub mod transport;

pub use protocol::{dispatch, decode_or_ignore, Effect, InvalidationEvent, Operation};
pub use transport::{ChannelTransport, RedisChannelTransport};
