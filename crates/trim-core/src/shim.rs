//! Shim descriptor wire format.
//!
//! A rewritten payload carries one descriptor in place of the duplicated
//! span:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 8 | marker: eight `0x61` bytes |
//! | 8 | 4 | reference id (u32, little-endian) |
//! | 12 | 2 | stored left offset (u16, little-endian) |
//! | 14 | 2 | stored right offset (u16, little-endian) |
//!
//! The marker is in-band, so genuine payload bytes can look like a
//! descriptor. [`scan`] applies the same heuristic on both sides of a link:
//! the first run that reaches exactly eight marker bytes and is followed by
//! eight bytes that are not all marker bytes is taken as the descriptor.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// The byte repeated to form the descriptor marker.
pub const MARKER_BYTE: u8 = b'a';

/// Number of marker bytes opening a descriptor.
pub const MARKER_LEN: usize = 8;

/// Encoded descriptor length in bytes.
pub const SHIM_LEN: usize = 16;

/// Errors decoding a descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShimError {
    /// Not enough bytes for a descriptor
    #[error("Insufficient bytes: expected {expected}, got {available}")]
    InsufficientBytes {
        /// Expected number of bytes
        expected: usize,
        /// Actually available bytes
        available: usize,
    },

    /// Marker bytes missing
    #[error("Missing descriptor marker")]
    MissingMarker,

    /// Stored span is inverted
    #[error("Inverted stored span: left {left} > right {right}")]
    InvertedSpan {
        /// Stored left offset
        left: u16,
        /// Stored right offset
        right: u16,
    },
}

/// Reference to a span of a stored payload, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShimDescriptor {
    /// Wire reference id of the stored payload
    pub ref_id: u32,
    /// First stored byte of the span (inclusive)
    pub stored_left: u16,
    /// Last stored byte of the span (inclusive)
    pub stored_right: u16,
}

impl ShimDescriptor {
    /// Creates a descriptor.
    pub const fn new(ref_id: u32, stored_left: u16, stored_right: u16) -> Self {
        Self {
            ref_id,
            stored_left,
            stored_right,
        }
    }

    /// Number of bytes the descriptor stands for, or `None` when the span
    /// is inverted.
    pub fn span_len(&self) -> Option<usize> {
        (self.stored_left <= self.stored_right)
            .then(|| usize::from(self.stored_right - self.stored_left) + 1)
    }

    /// Writes marker and fields into `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&[MARKER_BYTE; MARKER_LEN]);
        self.encode_fields(buf);
    }

    fn encode_fields(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.ref_id);
        buf.put_u16_le(self.stored_left);
        buf.put_u16_le(self.stored_right);
    }

    /// Returns the 16-byte encoding.
    pub fn to_bytes(&self) -> [u8; SHIM_LEN] {
        let mut out = [0u8; SHIM_LEN];
        let mut cursor = &mut out[..];
        self.encode(&mut cursor);
        out
    }

    /// Decodes a descriptor (marker included) from the front of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ShimError> {
        if bytes.len() < SHIM_LEN {
            return Err(ShimError::InsufficientBytes {
                expected: SHIM_LEN,
                available: bytes.len(),
            });
        }
        if bytes[..MARKER_LEN].iter().any(|&b| b != MARKER_BYTE) {
            return Err(ShimError::MissingMarker);
        }
        let desc = Self::decode_fields(&bytes[MARKER_LEN..SHIM_LEN]);
        if desc.stored_left > desc.stored_right {
            return Err(ShimError::InvertedSpan {
                left: desc.stored_left,
                right: desc.stored_right,
            });
        }
        Ok(desc)
    }

    // Caller guarantees eight bytes.
    fn decode_fields(mut fields: &[u8]) -> Self {
        Self {
            ref_id: fields.get_u32_le(),
            stored_left: fields.get_u16_le(),
            stored_right: fields.get_u16_le(),
        }
    }
}

/// A descriptor located inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShimHit {
    /// Offset of the first marker byte
    pub offset: usize,
    /// Decoded fields
    pub descriptor: ShimDescriptor,
}

/// Finds the first descriptor in `payload`.
///
/// Fields are not range checked here; an inverted span is returned as-is so
/// the caller can report it.
pub fn scan(payload: &[u8]) -> Option<ShimHit> {
    let mut run = 0usize;
    for (i, &byte) in payload.iter().enumerate() {
        if byte != MARKER_BYTE {
            run = 0;
            continue;
        }
        run += 1;
        if run != MARKER_LEN {
            continue;
        }
        let fields = match payload.get(i + 1..i + 1 + (SHIM_LEN - MARKER_LEN)) {
            Some(fields) => fields,
            None => continue,
        };
        if fields.iter().all(|&b| b == MARKER_BYTE) {
            continue;
        }
        return Some(ShimHit {
            offset: i + 1 - MARKER_LEN,
            descriptor: ShimDescriptor::decode_fields(fields),
        });
    }
    None
}
