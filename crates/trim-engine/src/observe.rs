//! Observability hooks.
//!
//! Stages report each processed payload to an optional observer supplied
//! by the caller. Nothing here is process-wide; two contexts can share an
//! observer or use separate ones.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::decoder::{DecodeAction, DecodeOutcome};
use crate::encoder::{EncodeAction, EncodeOutcome};

/// Receives one callback per processed payload.
pub trait TrimObserver: Send + Sync {
    /// Called after the encoder has processed a payload.
    fn on_encode(&self, _outcome: &EncodeOutcome) {}

    /// Called after the decoder has processed a payload.
    fn on_decode(&self, _outcome: &DecodeOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrimObserver for NoopObserver {}

/// Snapshot of [`CountingObserver`] counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrimStats {
    /// Payloads seen by the encoder
    pub encoded: u64,
    /// Payloads seen by the decoder
    pub decoded: u64,
    /// Bytes entering the encoder
    pub encoder_bytes_in: u64,
    /// Bytes leaving the encoder
    pub encoder_bytes_out: u64,
    /// Bytes entering the decoder
    pub decoder_bytes_in: u64,
    /// Bytes leaving the decoder
    pub decoder_bytes_out: u64,
    /// Payloads too short to fingerprint
    pub too_short: u64,
    /// Payloads rewritten with a descriptor
    pub rewritten: u64,
    /// Matches the encoder found but did not apply
    pub declined: u64,
    /// Emitted payloads the decoder would misread as carrying a descriptor
    pub marker_collisions: u64,
    /// Payloads the decoder rebuilt
    pub reconstructed: u64,
    /// Descriptors the decoder could not resolve
    pub rejected: u64,
}

impl TrimStats {
    /// Fraction of encoder input bytes removed from the link.
    pub fn savings(&self) -> f64 {
        if self.encoder_bytes_in == 0 {
            return 0.0;
        }
        1.0 - self.encoder_bytes_out as f64 / self.encoder_bytes_in as f64
    }
}

/// Observer that aggregates counters with relaxed atomics.
#[derive(Debug, Default)]
pub struct CountingObserver {
    encoded: AtomicU64,
    decoded: AtomicU64,
    encoder_bytes_in: AtomicU64,
    encoder_bytes_out: AtomicU64,
    decoder_bytes_in: AtomicU64,
    decoder_bytes_out: AtomicU64,
    too_short: AtomicU64,
    rewritten: AtomicU64,
    declined: AtomicU64,
    marker_collisions: AtomicU64,
    reconstructed: AtomicU64,
    rejected: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl CountingObserver {
    /// Creates an observer with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counter values.
    pub fn snapshot(&self) -> TrimStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        TrimStats {
            encoded: load(&self.encoded),
            decoded: load(&self.decoded),
            encoder_bytes_in: load(&self.encoder_bytes_in),
            encoder_bytes_out: load(&self.encoder_bytes_out),
            decoder_bytes_in: load(&self.decoder_bytes_in),
            decoder_bytes_out: load(&self.decoder_bytes_out),
            too_short: load(&self.too_short),
            rewritten: load(&self.rewritten),
            declined: load(&self.declined),
            marker_collisions: load(&self.marker_collisions),
            reconstructed: load(&self.reconstructed),
            rejected: load(&self.rejected),
        }
    }
}

impl TrimObserver for CountingObserver {
    fn on_encode(&self, outcome: &EncodeOutcome) {
        bump(&self.encoded, 1);
        bump(&self.encoder_bytes_in, outcome.original_len as u64);
        bump(&self.encoder_bytes_out, outcome.len as u64);
        match outcome.action {
            EncodeAction::TooShort => bump(&self.too_short, 1),
            EncodeAction::Rewritten { .. } => bump(&self.rewritten, 1),
            EncodeAction::Declined { .. } => bump(&self.declined, 1),
            EncodeAction::NoMatch => {}
        }
        if outcome.marker_collision {
            bump(&self.marker_collisions, 1);
        }
    }

    fn on_decode(&self, outcome: &DecodeOutcome) {
        bump(&self.decoded, 1);
        bump(&self.decoder_bytes_in, outcome.original_len as u64);
        bump(&self.decoder_bytes_out, outcome.len as u64);
        match outcome.action {
            DecodeAction::Reconstructed { .. } => bump(&self.reconstructed, 1),
            DecodeAction::Rejected { .. } => bump(&self.rejected, 1),
            DecodeAction::Passthrough => {}
        }
    }
}
