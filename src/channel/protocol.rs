//! Cache channel protocol: the wire shape of an invalidation event and
//! the dispatch table that applies one to a local L1 engine.

use crate::codec::{decode_value, encode_value};
use crate::error::Result;
use crate::l1::L1Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Join,
    Quit,
    Evict,
    Clear,
}

/// `(operation, region, keys, senderId)`, serialised through the same
/// tagged codec used for cached values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub operation: Operation,
    pub region: String,
    pub keys: Vec<String>,
    pub sender_id: String,
}

impl InvalidationEvent {
    #[must_use]
    pub fn join(sender_id: String) -> Self {
        Self {
            operation: Operation::Join,
            region: String::new(),
            keys: Vec::new(),
            sender_id,
        }
    }

    #[must_use]
    pub fn quit(sender_id: String) -> Self {
        Self {
            operation: Operation::Quit,
            region: String::new(),
            keys: Vec::new(),
            sender_id,
        }
    }

    #[must_use]
    pub fn evict(region: String, keys: Vec<String>, sender_id: String) -> Self {
        Self {
            operation: Operation::Evict,
            region,
            keys,
            sender_id,
        }
    }

    #[must_use]
    pub fn clear(region: String, sender_id: String) -> Self {
        Self {
            operation: Operation::Clear,
            region,
            keys: Vec::new(),
            sender_id,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_value(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Option<Self>> {
        decode_value(bytes)
    }
}

/// Outcome of applying a received event, for the manager's peer bookkeeping.
pub enum Effect {
    /// `senderId` matched our own; discarded without being applied.
    SelfEcho,
    Joined(String),
    Quit(String),
    Applied,
}

/// Apply one event to the local L1 engine. Self-sent events are discarded
/// before any other effect — a node never applies its own invalidation back
/// to itself. JOIN/QUIT have no cache effect; the manager uses the returned
/// [`Effect`] to update peer bookkeeping.
pub fn dispatch(event: &InvalidationEvent, local_sender_id: &str, l1: &dyn L1Engine) -> Effect {
    if event.sender_id == local_sender_id {
        return Effect::SelfEcho;
    }
    match event.operation {
        Operation::Join => Effect::Joined(event.sender_id.clone()),
        Operation::Quit => Effect::Quit(event.sender_id.clone()),
        Operation::Evict => {
            l1.evict_from_channel(&event.region, &event.keys);
            Effect::Applied
        }
        Operation::Clear => {
            l1.clear_from_channel(&event.region);
            Effect::Applied
        }
    }
}

/// Decode raw bytes into an event, logging and ignoring anything the codec
/// can't parse (forward-compatible with future operations).
pub fn decode_or_ignore(bytes: &[u8]) -> Option<InvalidationEvent> {
    match InvalidationEvent::decode(bytes) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!("invalidation event decoded to a null payload, ignoring");
            None
        }
        Err(e) => {
            debug!(error = %e, "unrecognised invalidation event, ignoring");
            None
        }
    }
}
