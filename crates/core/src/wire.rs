// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-describing wire format for anything stored as a node's payload or
//! sent across the daemon's socket: a magic prefix, a version byte, and a
//! zstd-compressed JSON body, readable by any client without executing
//! arbitrary code to decode it.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"OJW1";
const VERSION: u8 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload too short to contain a header")]
    Truncated,
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("json serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("json deserialization failed: {0}")]
    Deserialize(#[source] serde_json::Error),
}

/// Encode `value` as `MAGIC || VERSION || zstd(json(value))`.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let json = serde_json::to_vec(value).map_err(WireError::Serialize)?;
    let compressed = zstd::stream::encode_all(json.as_slice(), ZSTD_LEVEL).map_err(WireError::Compress)?;
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode a payload produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    if bytes.len() < MAGIC.len() + 1 {
        return Err(WireError::Truncated);
    }
    let (header, rest) = bytes.split_at(MAGIC.len());
    if header != MAGIC {
        return Err(WireError::BadMagic);
    }
    let (version, body) = rest.split_at(1);
    if version[0] != VERSION {
        return Err(WireError::UnsupportedVersion(version[0]));
    }
    let json = zstd::stream::decode_all(body).map_err(WireError::Decompress)?;
    serde_json::from_slice(&json).map_err(WireError::Deserialize)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
