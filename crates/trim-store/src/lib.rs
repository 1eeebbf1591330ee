//! Trim Store - Content history for one processing context.
//!
//! Provides:
//! - A fixed-capacity circular payload store with implicit eviction
//! - A fingerprint index mapping sampled window hashes to stored payloads
//!
//! Neither structure is shared between contexts; each encoder or decoder
//! owns its own pair.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fingerprint;
pub mod payload;

pub use fingerprint::{FingerprintIndex, FingerprintRecord};
pub use payload::{PayloadStore, PayloadStoreStats};

use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Payload does not fit a slot
    #[error("Payload too large: {len} bytes exceeds slot size {slot_size}")]
    PayloadTooLarge {
        /// Payload length
        len: usize,
        /// Slot size
        slot_size: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] trim_core::ConfigError),
}
