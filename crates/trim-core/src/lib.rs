//! Trim Core - Shared types for inline redundancy elimination.
//!
//! This crate provides:
//! - Sequence identifiers and the wraparound-aware validity rule
//! - Stage configuration shared by the encoder and decoder
//! - The 16-byte shim descriptor wire format and its marker scan

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod sequence;
pub mod shim;

pub use config::{ConfigError, TrimConfig};
pub use sequence::{SequenceId, SequenceSpace};
pub use shim::{scan, ShimDescriptor, ShimError, ShimHit};

/// Number of trailing bytes covered by one fingerprint window.
pub const WINDOW_SIZE: usize = 64;

/// Number of anchors sampled per payload.
pub const ANCHOR_COUNT: usize = 16;

/// Payloads at or below this length are never fingerprinted.
pub const MIN_FINGERPRINT_LEN: usize = WINDOW_SIZE - 1 + ANCHOR_COUNT;

/// Default number of payload slots in a store.
pub const DEFAULT_STORE_CAPACITY: usize = 1_000_000;

/// Default maximum payload size in bytes.
pub const DEFAULT_MAX_PAYLOAD: usize = 1500;

/// Default SequenceId modulus.
pub const DEFAULT_SEQUENCE_MODULUS: u64 = 10_000_000_000;

/// Default modulus of the reference id carried on the wire.
pub const DEFAULT_REF_ID_SPACE: u64 = 1_000_000_000;
