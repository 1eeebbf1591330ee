//! Trim Rabin - Rolling fingerprint used to sample payload content.
//!
//! Implements a Rabin fingerprint over GF(2) with a fixed irreducible
//! polynomial. The window keeps the last [`WINDOW_SIZE`] bytes of a stream
//! and updates the fingerprint in constant time as each byte is fed.
//!
//! # Design Rationale
//!
//! Fingerprints are sampled at a few anchors per payload and compared
//! across payloads, so the hash of a window must depend only on the bytes
//! inside it. Rabin fingerprints have that property and are cheap to roll:
//! one table lookup removes the outgoing byte and one appends the new byte.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod poly;
mod window;

pub use poly::{polymmult, polymod, polymult};
pub use trim_core::WINDOW_SIZE;
pub use window::{RabinTables, RabinWindow, RABIN_TABLES};

/// Irreducible polynomial of degree 63 used for all fingerprints.
pub const FINGERPRINT_POLY: u64 = 0xbfe6_b8a5_bf37_8d83;
