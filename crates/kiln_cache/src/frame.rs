//! Validated binary framing for artifacts and cache tables.
//!
//! Every binary file the cache writes starts with a 4-byte little-endian
//! header length, followed by a bincode-encoded [`FrameHeader`] and the
//! payload. The header carries magic bytes, the format version and a
//! checksum of the payload, so truncated or tampered files are detected on
//! read instead of being decoded into garbage.

use std::path::Path;

use kiln_common::ContentHash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache file.
pub const FRAME_MAGIC: [u8; 4] = *b"KILN";

/// Current frame format version. Increment on breaking changes to the
/// header or to any payload layout.
pub const FRAME_FORMAT_VERSION: u32 = 1;

/// Header prepended to every framed cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Frame format version.
    pub format_version: u32,

    /// Tool version that produced this file.
    pub tool_version: String,

    /// Content hash of the payload.
    pub checksum: ContentHash,
}

/// Wraps `payload` in a validated frame.
pub fn encode_frame(payload: &[u8], tool_version: &str) -> Result<Vec<u8>, CacheError> {
    let header = FrameHeader {
        magic: FRAME_MAGIC,
        format_version: FRAME_FORMAT_VERSION,
        tool_version: tool_version.to_string(),
        checksum: ContentHash::from_bytes(payload),
    };

    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(payload);
    Ok(output)
}

/// Validates a frame read from `path` and returns its payload.
pub fn decode_frame<'a>(path: &Path, raw: &'a [u8]) -> Result<&'a [u8], CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("truncated header length"));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&raw[..4]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (FrameHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != FRAME_MAGIC {
        return Err(invalid("bad magic bytes"));
    }
    if header.format_version != FRAME_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: FRAME_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(payload)
}

/// Serializes `value` with bincode and frames it.
pub fn encode_value<T: Serialize>(value: &T, tool_version: &str) -> Result<Vec<u8>, CacheError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
        |e| CacheError::Serialization {
            reason: e.to_string(),
        },
    )?;
    encode_frame(&payload, tool_version)
}

/// Validates the frame read from `path` and deserializes its payload.
pub fn decode_value<T: DeserializeOwned>(path: &Path, raw: &[u8]) -> Result<T, CacheError> {
    let payload = decode_frame(path, raw)?;
    let (value, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: format!("{}: {e}", path.display()),
        })?;
    Ok(value)
}
