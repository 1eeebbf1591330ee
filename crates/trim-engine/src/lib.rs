//! Trim Engine - Encoder and decoder stages.
//!
//! The encoder replaces content it has already sent with a 16-byte shim
//! descriptor; the decoder on the far side of the link rebuilds the
//! original payload from its mirrored history. Both stages process one
//! payload at a time, in arrival order, rewriting it in the caller's
//! buffer.
//!
//! ```
//! use trim_core::TrimConfig;
//! use trim_engine::{Decoder, Encoder};
//!
//! let config = TrimConfig::with_capacity(8);
//! let mut encoder = Encoder::new(config.clone()).unwrap();
//! let mut decoder = Decoder::new(config).unwrap();
//!
//! let mut buf = vec![0u8; 1500];
//! let payload = b"short payloads pass straight through";
//! buf[..payload.len()].copy_from_slice(payload);
//!
//! let sent = encoder.process(&mut buf, payload.len()).unwrap();
//! let received = decoder.process(&mut buf, sent.len).unwrap();
//! assert_eq!(&buf[..received.len], payload);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod context;
pub mod decoder;
pub mod encoder;
pub mod expand;
pub mod frame;
pub mod observe;

pub use context::ContextSet;
pub use decoder::{DecodeAction, DecodeOutcome, Decoder, RejectReason};
pub use encoder::{DeclineReason, EncodeAction, EncodeOutcome, Encoder};
pub use expand::{Candidate, MatchExpander, ShimRegion};
pub use frame::{PayloadBuf, PayloadFrame};
pub use observe::{CountingObserver, NoopObserver, TrimObserver, TrimStats};

use thiserror::Error;

/// Errors from the encoder and decoder stages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Payload exceeds the configured maximum
    #[error("Payload too large: {len} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload length
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Declared payload length exceeds the buffer holding it
    #[error("Payload length {len} exceeds buffer of {capacity} bytes")]
    LengthOutOfBounds {
        /// Declared length
        len: usize,
        /// Buffer length
        capacity: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] trim_core::ConfigError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] trim_store::StoreError),
}

/// Checks a payload handed to either stage before any state is touched.
pub(crate) fn check_payload(buf: &[u8], len: usize, max: usize) -> Result<(), EngineError> {
    if len > buf.len() {
        return Err(EngineError::LengthOutOfBounds {
            len,
            capacity: buf.len(),
        });
    }
    if len > max {
        return Err(EngineError::PayloadTooLarge { len, max });
    }
    Ok(())
}
