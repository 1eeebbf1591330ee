//! Fingerprint index.
//!
//! Maps a sampled window fingerprint to the payload and offset it was last
//! seen at. A newer record for the same fingerprint replaces the older one.
//! Records are not removed when the payload they point to is evicted;
//! callers check residency on lookup, and [`FingerprintIndex::purge_stale`]
//! keeps the map from growing past its configured limit.

use std::collections::HashMap;

use trim_core::{SequenceId, TrimConfig};
use tracing::debug;

const INITIAL_CAPACITY: usize = 1 << 16;

/// Location of a sampled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintRecord {
    /// Payload the window was sampled from
    pub id: SequenceId,
    /// Offset of the first window byte within that payload
    pub offset: u16,
}

/// Hash-to-location map for one context.
pub struct FingerprintIndex {
    entries: HashMap<u64, FingerprintRecord>,
    limit: usize,
    purges: u64,
}

impl FingerprintIndex {
    /// Creates an index that purges once it holds `limit` records.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(limit.min(INITIAL_CAPACITY)),
            limit,
            purges: 0,
        }
    }

    /// Creates an index sized for the given configuration.
    pub fn new(config: &TrimConfig) -> Self {
        Self::with_limit(config.index_limit())
    }

    /// Records that `hash` was last seen at `offset` in payload `id`.
    pub fn put(&mut self, hash: u64, id: SequenceId, offset: u16) {
        self.entries.insert(hash, FingerprintRecord { id, offset });
    }

    /// Returns the latest record for `hash`.
    pub fn lookup(&self, hash: u64) -> Option<FingerprintRecord> {
        self.entries.get(&hash).copied()
    }

    /// Returns the number of records held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the record limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns how many purges have run.
    pub fn purges(&self) -> u64 {
        self.purges
    }

    /// Returns true once the index has reached its limit.
    pub fn needs_purge(&self) -> bool {
        self.entries.len() >= self.limit
    }

    /// Drops every record whose payload is no longer live. Returns the
    /// number of records removed.
    pub fn purge_stale(&mut self, mut is_live: impl FnMut(SequenceId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| is_live(record.id));
        let removed = before - self.entries.len();
        self.purges += 1;
        debug!(
            removed,
            remaining = self.entries.len(),
            limit = self.limit,
            "Purged stale fingerprints"
        );
        removed
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
