//! Reverse path: rebuild payloads that carry a shim descriptor.

use std::sync::Arc;

use tracing::{debug, trace};
use trim_core::shim::SHIM_LEN;
use trim_core::{scan, SequenceId, ShimDescriptor, ShimHit, TrimConfig};
use trim_store::PayloadStore;

use crate::frame::PayloadFrame;
use crate::observe::TrimObserver;
use crate::{check_payload, EngineError};

/// Why a descriptor could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The wire reference does not name an earlier payload
    Unresolvable,
    /// The referenced payload has left the history window
    Stale,
    /// The referenced slot holds no payload for that id
    Missing,
    /// The referenced payload is empty
    EmptySlot,
    /// The stored span is inverted
    InvertedSpan,
    /// The stored span extends past the referenced payload
    OutOfBounds,
    /// The rebuilt payload would not fit the buffer or the maximum size
    Oversize,
}

/// What the decoder did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeAction {
    /// No descriptor present
    Passthrough,
    /// Descriptor replaced by the referenced span
    Reconstructed {
        /// Payload the span was copied from
        ref_id: SequenceId,
        /// Offset the descriptor was found at
        offset: usize,
        /// Decoded descriptor
        descriptor: ShimDescriptor,
    },
    /// Descriptor found but the payload was passed through unmodified
    Rejected {
        /// Offset the descriptor was found at
        offset: usize,
        /// Decoded descriptor
        descriptor: ShimDescriptor,
        /// Why it was not applied
        reason: RejectReason,
    },
}

/// Result of decoding one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Id the payload was recorded under
    pub id: SequenceId,
    /// Payload length before decoding
    pub original_len: usize,
    /// Payload length after decoding
    pub len: usize,
    /// What happened
    pub action: DecodeAction,
}

impl DecodeOutcome {
    /// Returns true if the payload was rebuilt.
    pub fn is_reconstructed(&self) -> bool {
        matches!(self.action, DecodeAction::Reconstructed { .. })
    }
}

/// Decoder stage for one processing context.
pub struct Decoder {
    config: TrimConfig,
    store: PayloadStore,
    observer: Option<Arc<dyn TrimObserver>>,
}

impl Decoder {
    /// Creates a decoder, allocating its store up front.
    pub fn new(config: TrimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            store: PayloadStore::new(&config)?,
            observer: None,
            config,
        })
    }

    /// Attaches an observer notified after every payload.
    pub fn with_observer(mut self, observer: Arc<dyn TrimObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TrimConfig {
        &self.config
    }

    /// Returns the id the next payload will be recorded under.
    pub fn next_id(&self) -> SequenceId {
        self.store.next_id()
    }

    /// Returns the payload history.
    pub fn store(&self) -> &PayloadStore {
        &self.store
    }

    /// Decodes the first `len` bytes of `buf` in place.
    ///
    /// A rebuilt payload may be longer than the received one; it never
    /// grows past `buf.len()` or the configured maximum, and a descriptor
    /// that would require it is left in place.
    pub fn process(&mut self, buf: &mut [u8], len: usize) -> Result<DecodeOutcome, EngineError> {
        check_payload(buf, len, self.config.max_payload)?;
        let current = self.store.next_id();

        let mut out_len = len;
        let action = match scan(&buf[..len]) {
            None => DecodeAction::Passthrough,
            Some(hit) => match self.rebuild(buf, len, current, hit) {
                Ok((ref_id, rebuilt_len)) => {
                    out_len = rebuilt_len;
                    debug!(
                        id = %current,
                        ref_id = %ref_id,
                        from = len,
                        to = rebuilt_len,
                        "Rebuilt payload"
                    );
                    DecodeAction::Reconstructed {
                        ref_id,
                        offset: hit.offset,
                        descriptor: hit.descriptor,
                    }
                }
                Err(reason) => {
                    debug!(id = %current, ?reason, ref_id = hit.descriptor.ref_id, "Descriptor not applied");
                    DecodeAction::Rejected {
                        offset: hit.offset,
                        descriptor: hit.descriptor,
                        reason,
                    }
                }
            },
        };

        let id = self.store.insert(&buf[..out_len])?;
        let outcome = DecodeOutcome {
            id,
            original_len: len,
            len: out_len,
            action,
        };
        trace!(id = %id, from = len, to = out_len, "Decoded payload");
        if let Some(observer) = &self.observer {
            observer.on_decode(&outcome);
        }
        Ok(outcome)
    }

    /// Decodes a frame in place, updating its payload length.
    pub fn process_frame<F: PayloadFrame + ?Sized>(
        &mut self,
        frame: &mut F,
    ) -> Result<DecodeOutcome, EngineError> {
        let len = frame.payload_len();
        let outcome = self.process(frame.payload_buf(), len)?;
        if outcome.len != len {
            frame.set_payload_len(outcome.len);
        }
        Ok(outcome)
    }

    /// Replaces the descriptor at `hit` with the referenced span. Leaves
    /// `buf` untouched unless every check passes.
    fn rebuild(
        &self,
        buf: &mut [u8],
        len: usize,
        current: SequenceId,
        hit: ShimHit,
    ) -> Result<(SequenceId, usize), RejectReason> {
        let desc = hit.descriptor;
        let ref_id = self
            .store
            .space()
            .from_wire(current, desc.ref_id)
            .ok_or(RejectReason::Unresolvable)?;
        if !self.store.is_resident(ref_id) {
            return Err(RejectReason::Stale);
        }
        let stored = self.store.get(ref_id).ok_or(RejectReason::Missing)?;
        if stored.is_empty() {
            return Err(RejectReason::EmptySlot);
        }
        let span = desc.span_len().ok_or(RejectReason::InvertedSpan)?;
        let left = usize::from(desc.stored_left);
        let right = usize::from(desc.stored_right);
        if right >= stored.len() {
            return Err(RejectReason::OutOfBounds);
        }
        let out_len = len - SHIM_LEN + span;
        if out_len > buf.len() || out_len > self.config.max_payload {
            return Err(RejectReason::Oversize);
        }

        // Move the tail first so a span longer than the descriptor does not
        // overwrite bytes still to be moved.
        let tail = hit.offset + SHIM_LEN;
        buf.copy_within(tail..len, hit.offset + span);
        buf[hit.offset..hit.offset + span].copy_from_slice(&stored[left..=right]);
        Ok((ref_id, out_len))
    }

    /// Forgets all history. Must be applied to both ends of a link at the
    /// same point in the payload stream.
    pub fn clear(&mut self) {
        self.store.clear();
        debug!("Cleared decoder context");
    }
}
