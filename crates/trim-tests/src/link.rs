//! An encoder and a decoder joined back to back.

use std::sync::Arc;

use tracing::debug;
use trim_core::TrimConfig;
use trim_engine::{
    CountingObserver, DecodeOutcome, Decoder, EncodeOutcome, Encoder, EngineError, TrimStats,
};

/// What happened to one payload crossing the link.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Encoder result
    pub encoded: EncodeOutcome,
    /// Bytes put on the wire
    pub wire: Vec<u8>,
    /// Decoder result
    pub decoded: DecodeOutcome,
    /// Bytes handed to the receiver
    pub delivered: Vec<u8>,
}

impl Transfer {
    /// Returns true if the receiver got exactly `sent`.
    pub fn intact(&self, sent: &[u8]) -> bool {
        self.delivered == sent
    }
}

/// One encoder context feeding one decoder context.
pub struct Link {
    /// Sending side
    pub encoder: Encoder,
    /// Receiving side
    pub decoder: Decoder,
    stats: Arc<CountingObserver>,
    buf: Vec<u8>,
}

impl Link {
    /// Creates a link with both ends using `config`.
    pub fn new(config: TrimConfig) -> Result<Self, EngineError> {
        let stats = Arc::new(CountingObserver::new());
        let encoder = Encoder::new(config.clone())?.with_observer(stats.clone());
        let decoder = Decoder::new(config.clone())?.with_observer(stats.clone());
        Ok(Self {
            encoder,
            decoder,
            stats,
            buf: vec![0u8; config.max_payload],
        })
    }

    /// Creates a link with a small store, suitable for tests that cycle
    /// through the history.
    pub fn with_capacity(capacity: usize) -> Result<Self, EngineError> {
        Self::new(TrimConfig::with_capacity(capacity))
    }

    /// Sends `payload` through both stages.
    pub fn send(&mut self, payload: &[u8]) -> Result<Transfer, EngineError> {
        let len = payload.len();
        if len > self.buf.len() {
            return Err(EngineError::PayloadTooLarge {
                len,
                max: self.buf.len(),
            });
        }
        self.buf[..len].copy_from_slice(payload);

        let encoded = self.encoder.process(&mut self.buf, len)?;
        let wire = self.buf[..encoded.len].to_vec();
        let decoded = self.decoder.process(&mut self.buf, encoded.len)?;
        let delivered = self.buf[..decoded.len].to_vec();

        debug!(
            id = %encoded.id,
            sent = len,
            wire = wire.len(),
            delivered = delivered.len(),
            "Payload crossed link"
        );
        Ok(Transfer {
            encoded,
            wire,
            decoded,
            delivered,
        })
    }

    /// Clears both ends.
    pub fn clear(&mut self) {
        self.encoder.clear();
        self.decoder.clear();
    }

    /// Returns counters collected from both ends.
    pub fn stats(&self) -> TrimStats {
        self.stats.snapshot()
    }
}
