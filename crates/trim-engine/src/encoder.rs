//! Forward path: replace previously seen content with a shim descriptor.

use std::sync::Arc;

use tracing::{debug, trace, warn};
use trim_core::shim::SHIM_LEN;
use trim_core::{
    scan, SequenceId, ShimDescriptor, TrimConfig, ANCHOR_COUNT, MIN_FINGERPRINT_LEN, WINDOW_SIZE,
};
use trim_rabin::RabinWindow;
use trim_store::{FingerprintIndex, PayloadStore};

use crate::expand::{Candidate, MatchExpander, ShimRegion};
use crate::frame::PayloadFrame;
use crate::observe::TrimObserver;
use crate::{check_payload, EngineError};

/// Why a match was found but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The span is not longer than the descriptor replacing it
    SpanTooShort,
    /// The decoder would not locate the descriptor where it was written
    MarkerAmbiguity,
}

/// What the encoder did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeAction {
    /// Too short to fingerprint; passed through
    TooShort,
    /// No resident duplicate found; passed through
    NoMatch,
    /// Duplicate span replaced by a descriptor
    Rewritten {
        /// Span that was removed
        region: ShimRegion,
        /// Descriptor written in its place
        descriptor: ShimDescriptor,
    },
    /// Duplicate span found but the payload was passed through
    Declined {
        /// Best span found
        region: ShimRegion,
        /// Why it was not applied
        reason: DeclineReason,
    },
}

/// Result of encoding one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// Id the payload was recorded under
    pub id: SequenceId,
    /// Payload length before encoding
    pub original_len: usize,
    /// Payload length after encoding
    pub len: usize,
    /// What happened
    pub action: EncodeAction,
    /// The emitted payload contains bytes the decoder will read as a
    /// descriptor although none was written
    pub marker_collision: bool,
}

impl EncodeOutcome {
    /// Returns true if the payload was rewritten.
    pub fn is_rewritten(&self) -> bool {
        matches!(self.action, EncodeAction::Rewritten { .. })
    }

    /// Returns the descriptor written into the payload, if any.
    pub fn descriptor(&self) -> Option<ShimDescriptor> {
        match self.action {
            EncodeAction::Rewritten { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }
}

/// Anchor positions for a payload of `len` bytes: sixteen evenly spaced
/// window ends in `[WINDOW_SIZE - 1, len - 1]`.
///
/// `len` must exceed [`MIN_FINGERPRINT_LEN`], which keeps the anchors
/// strictly increasing.
pub fn anchor_positions(len: usize) -> [usize; ANCHOR_COUNT] {
    debug_assert!(len > MIN_FINGERPRINT_LEN);
    let first = WINDOW_SIZE - 1;
    let spread = len - 1 - first;
    let mut anchors = [0usize; ANCHOR_COUNT];
    for (i, anchor) in anchors.iter_mut().enumerate() {
        *anchor = first + i * spread / ANCHOR_COUNT;
    }
    anchors
}

/// Encoder stage for one processing context.
pub struct Encoder {
    config: TrimConfig,
    store: PayloadStore,
    index: FingerprintIndex,
    window: RabinWindow,
    expander: MatchExpander,
    /// Fingerprints sampled from the current payload, flushed after the scan
    staged: [(u64, u16); ANCHOR_COUNT],
    /// Rewritten payload under construction
    scratch: Box<[u8]>,
    observer: Option<Arc<dyn TrimObserver>>,
}

impl Encoder {
    /// Creates an encoder, allocating its store and index up front.
    pub fn new(config: TrimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            store: PayloadStore::new(&config)?,
            index: FingerprintIndex::new(&config),
            window: RabinWindow::new(),
            expander: MatchExpander::default(),
            staged: [(0, 0); ANCHOR_COUNT],
            scratch: vec![0u8; config.max_payload].into_boxed_slice(),
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

    /// Returns the fingerprint index.
    pub fn index(&self) -> &FingerprintIndex {
        &self.index
    }

    /// Encodes the first `len` bytes of `buf` in place.
    ///
    /// On a rewrite the payload shrinks to [`EncodeOutcome::len`] bytes; the
    /// caller must update the packet length to match. Oversized payloads are
    /// rejected before any state changes.
    pub fn process(&mut self, buf: &mut [u8], len: usize) -> Result<EncodeOutcome, EngineError> {
        check_payload(buf, len, self.config.max_payload)?;
        let id = self.store.next_id();

        let (best, staged) = if len > MIN_FINGERPRINT_LEN {
            (self.sample(&buf[..len], id), ANCHOR_COUNT)
        } else {
            (None, 0)
        };

        let action = match best {
            None if staged == 0 => EncodeAction::TooShort,
            None => EncodeAction::NoMatch,
            Some(region) => match self.build_rewrite(&buf[..len], region) {
                Ok(descriptor) => EncodeAction::Rewritten { region, descriptor },
                Err(reason) => EncodeAction::Declined { region, reason },
            },
        };

        // The history keeps the original layout: staged offsets and every
        // later stored offset refer to it, and the decoder stores the
        // rebuilt payload.
        self.store.insert(&buf[..len])?;
        for &(hash, offset) in &self.staged[..staged] {
            self.index.put(hash, id, offset);
        }
        if self.index.needs_purge() {
            let store = &self.store;
            self.index.purge_stale(|record| store.is_resident(record));
        }

        let mut out_len = len;
        if let EncodeAction::Rewritten { region, .. } = action {
            out_len = len - region.span_len() + SHIM_LEN;
            buf[..out_len].copy_from_slice(&self.scratch[..out_len]);
            debug!(
                id = %id,
                ref_id = %region.ref_id,
                span = region.span_len(),
                from = len,
                to = out_len,
                "Rewrote payload"
            );
        }

        let marker_collision = out_len == len && scan(&buf[..len]).is_some();
        if marker_collision {
            warn!(id = %id, len, "Payload contains a descriptor marker it was not given");
        }

        let outcome = EncodeOutcome {
            id,
            original_len: len,
            len: out_len,
            action,
            marker_collision,
        };
        trace!(id = %id, from = len, to = out_len, "Encoded payload");
        if let Some(observer) = &self.observer {
            observer.on_encode(&outcome);
        }
        Ok(outcome)
    }

    /// Encodes a frame in place, updating its payload length.
    pub fn process_frame<F: PayloadFrame + ?Sized>(
        &mut self,
        frame: &mut F,
    ) -> Result<EncodeOutcome, EngineError> {
        let len = frame.payload_len();
        let outcome = self.process(frame.payload_buf(), len)?;
        if outcome.len != len {
            frame.set_payload_len(outcome.len);
        }
        Ok(outcome)
    }

    /// Samples the anchors of `payload`, returning the longest resident
    /// duplicate span and leaving the sampled fingerprints in `staged`.
    fn sample(&mut self, payload: &[u8], id: SequenceId) -> Option<ShimRegion> {
        let anchors = anchor_positions(payload.len());
        let mut best = None;
        let mut next = 0;

        self.window.reset();
        for (i, &byte) in payload.iter().enumerate() {
            let hash = self.window.slide(byte);
            if i != anchors[next] {
                continue;
            }
            let window_start = i + 1 - WINDOW_SIZE;

            if let Some(record) = self.index.lookup(hash) {
                if let Some(bytes) = self.store.get(record.id) {
                    let candidate = Candidate {
                        id: record.id,
                        bytes,
                        offset: usize::from(record.offset),
                    };
                    if let Some(region) = self.expander.expand(payload, id, window_start, candidate)
                    {
                        MatchExpander::offer(&mut best, region);
                    }
                }
            }

            self.staged[next] = (hash, window_start as u16);
            next += 1;
            if next == ANCHOR_COUNT {
                break;
            }
        }
        best
    }

    /// Builds the rewritten payload in `scratch` and checks that the
    /// decoder will find the descriptor where it was placed.
    fn build_rewrite(
        &mut self,
        payload: &[u8],
        region: ShimRegion,
    ) -> Result<ShimDescriptor, DeclineReason> {
        let span = region.span_len();
        if span <= SHIM_LEN {
            return Err(DeclineReason::SpanTooShort);
        }

        let descriptor = ShimDescriptor::new(
            self.store.space().to_wire(region.ref_id),
            region.stored_left as u16,
            region.stored_right as u16,
        );
        let out_len = payload.len() - span + SHIM_LEN;
        let shim_end = region.orig_left + SHIM_LEN;

        let out = &mut self.scratch[..out_len];
        out[..region.orig_left].copy_from_slice(&payload[..region.orig_left]);
        out[region.orig_left..shim_end].copy_from_slice(&descriptor.to_bytes());
        out[shim_end..].copy_from_slice(&payload[region.orig_right + 1..]);

        match scan(out) {
            Some(hit) if hit.offset == region.orig_left && hit.descriptor == descriptor => {
                Ok(descriptor)
            }
            _ => Err(DeclineReason::MarkerAmbiguity),
        }
    }

    /// Forgets all history. Must be applied to both ends of a link at the
    /// same point in the payload stream.
    pub fn clear(&mut self) {
        self.store.clear();
        self.index.clear();
        self.window.reset();
        debug!("Cleared encoder context");
    }
}
