//! Serialization codec.
//!
//! Every value the broker stores — cached entries and invalidation events
//! alike — goes through the same tagged, length-framed byte format: one tag
//! byte identifying the shape, followed by a payload. `encode`/`decode` are
//! exact inverses for every tag, and the codec is injective on inputs:
//! `decode(encode(v))` is structurally equal to `v`.
//!
//! Arbitrary `Serialize` values ride the `Object` tag as framed
//! `serde_json` bytes. A `None`/JSON-`null` input encodes to the bare `Null`
//! tag with no payload — callers (the cache manager) treat that as a
//! request to evict rather than to store, per the broker's codec contract.

use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

const TAG_NULL: u8 = 0;
const TAG_STR: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_I8: u8 = 3;
const TAG_I16: u8 = 4;
const TAG_I32: u8 = 5;
const TAG_I64: u8 = 6;
const TAG_F32: u8 = 7;
const TAG_F64: u8 = 8;
const TAG_BYTES: u8 = 9;
const TAG_DATE_MILLIS: u8 = 10;
const TAG_OBJECT: u8 = 11;

/// One decoded cache value, tagged by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Null,
    Str(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    /// Epoch milliseconds.
    DateMillis(i64),
    /// Opaque framed payload, produced by `serde_json` for any `Serialize` type.
    Object(Vec<u8>),
}

fn write_framed(tag: u8, payload: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

/// Encode a [`CacheValue`] to its tagged byte representation.
#[must_use]
pub fn encode(value: &CacheValue) -> Vec<u8> {
    match value {
        CacheValue::Null => vec![TAG_NULL],
        CacheValue::Str(s) => {
            let mut out = Vec::with_capacity(s.len() + 5);
            write_framed(TAG_STR, s.as_bytes(), &mut out);
            out
        }
        CacheValue::Bool(b) => vec![TAG_BOOL, u8::from(*b)],
        CacheValue::I8(v) => vec![TAG_I8, v.to_le_bytes()[0]],
        CacheValue::I16(v) => {
            let mut out = vec![TAG_I16];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        CacheValue::I32(v) => {
            let mut out = vec![TAG_I32];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        CacheValue::I64(v) => {
            let mut out = vec![TAG_I64];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        CacheValue::F32(v) => {
            let mut out = vec![TAG_F32];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        CacheValue::F64(v) => {
            let mut out = vec![TAG_F64];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
        CacheValue::Bytes(b) => {
            let mut out = Vec::with_capacity(b.len() + 5);
            write_framed(TAG_BYTES, b, &mut out);
            out
        }
        CacheValue::DateMillis(millis) => {
            let mut out = vec![TAG_DATE_MILLIS];
            out.extend_from_slice(&millis.to_le_bytes());
            out
        }
        CacheValue::Object(bytes) => {
            let mut out = Vec::with_capacity(bytes.len() + 5);
            write_framed(TAG_OBJECT, bytes, &mut out);
            out
        }
    }
}

fn read_framed(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < 4 {
        return Err(CacheError::Serialization(
            "truncated length prefix".to_string(),
        ));
    }
    let Some(len_bytes) = bytes.get(0..4) else {
        return Err(CacheError::Serialization(
            "truncated length prefix".to_string(),
        ));
    };
    let len_arr: [u8; 4] = len_bytes
        .try_into()
        .map_err(|_| CacheError::Serialization("bad length prefix".to_string()))?;
    let len = u32::from_le_bytes(len_arr) as usize;
    bytes
        .get(4..4 + len)
        .ok_or_else(|| CacheError::Serialization("truncated payload".to_string()))
}

/// Decode a tagged byte string back into a [`CacheValue`].
pub fn decode(bytes: &[u8]) -> Result<CacheValue> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| CacheError::Serialization("empty payload".to_string()))?;

    match tag {
        TAG_NULL => Ok(CacheValue::Null),
        TAG_STR => {
            let payload = read_framed(rest)?;
            let s = String::from_utf8(payload.to_vec())
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            Ok(CacheValue::Str(s))
        }
        TAG_BOOL => {
            let b = rest
                .first()
                .ok_or_else(|| CacheError::Serialization("truncated bool".to_string()))?;
            Ok(CacheValue::Bool(*b != 0))
        }
        TAG_I8 => {
            let b = rest
                .first()
                .ok_or_else(|| CacheError::Serialization("truncated i8".to_string()))?;
            Ok(CacheValue::I8(*b as i8))
        }
        TAG_I16 => {
            let arr: [u8; 2] = rest
                .get(0..2)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated i16".to_string()))?;
            Ok(CacheValue::I16(i16::from_le_bytes(arr)))
        }
        TAG_I32 => {
            let arr: [u8; 4] = rest
                .get(0..4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated i32".to_string()))?;
            Ok(CacheValue::I32(i32::from_le_bytes(arr)))
        }
        TAG_I64 => {
            let arr: [u8; 8] = rest
                .get(0..8)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated i64".to_string()))?;
            Ok(CacheValue::I64(i64::from_le_bytes(arr)))
        }
        TAG_F32 => {
            let arr: [u8; 4] = rest
                .get(0..4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated f32".to_string()))?;
            Ok(CacheValue::F32(f32::from_le_bytes(arr)))
        }
        TAG_F64 => {
            let arr: [u8; 8] = rest
                .get(0..8)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated f64".to_string()))?;
            Ok(CacheValue::F64(f64::from_le_bytes(arr)))
        }
        TAG_BYTES => {
            let payload = read_framed(rest)?;
            Ok(CacheValue::Bytes(payload.to_vec()))
        }
        TAG_DATE_MILLIS => {
            let arr: [u8; 8] = rest
                .get(0..8)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CacheError::Serialization("truncated date".to_string()))?;
            Ok(CacheValue::DateMillis(i64::from_le_bytes(arr)))
        }
        TAG_OBJECT => {
            let payload = read_framed(rest)?;
            Ok(CacheValue::Object(payload.to_vec()))
        }
        other => Err(CacheError::Serialization(format!(
            "unknown codec tag {other}"
        ))),
    }
}

/// Encode an arbitrary serializable value for storage.
///
/// A value that serializes to JSON `null` (e.g. `Option::None`) is encoded
/// as the bare `Null` tag; the cache manager treats this as an eviction
/// request rather than a store, per the codec's contract.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_value(value)?;
    if json.is_null() {
        return Ok(encode(&CacheValue::Null));
    }
    let bytes = serde_json::to_vec(&json)?;
    Ok(encode(&CacheValue::Object(bytes)))
}

/// Decode a value previously produced by [`encode_value`].
///
/// Returns `Ok(None)` for the `Null` tag (an evicted/absent marker), never
/// for a missing key — the manager distinguishes "stored null" from "no
/// entry" at the engine level, not here.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    match decode(bytes)? {
        CacheValue::Null => Ok(None),
        CacheValue::Object(json_bytes) => {
            let value = serde_json::from_slice(&json_bytes)?;
            Ok(Some(value))
        }
        other => Err(CacheError::Serialization(format!(
            "expected Object or Null tag, found {other:?}"
        ))),
    }
}
