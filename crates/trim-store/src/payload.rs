//! Circular payload store.
//!
//! Slot `id mod capacity` holds the payload most recently assigned to that
//! slot. Inserting overwrites whatever was there; there is no explicit
//! eviction. Each slot remembers the id that wrote it, so a lookup for an
//! older id sharing the slot reports the content as gone.

use trim_core::{SequenceId, SequenceSpace, TrimConfig};
use tracing::trace;

use crate::StoreError;

/// Counters for one payload store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayloadStoreStats {
    /// Payloads inserted
    pub inserted: u64,
    /// Inserts that replaced a previous payload
    pub overwritten: u64,
    /// Bytes inserted
    pub bytes_inserted: u64,
}

/// Fixed-capacity store of recent payloads, keyed by SequenceId.
pub struct PayloadStore {
    space: SequenceSpace,
    slot_size: usize,
    /// `capacity * slot_size` bytes, one contiguous region per slot
    data: Vec<u8>,
    /// Payload length per slot
    lens: Vec<u32>,
    /// Id that last wrote each slot
    owners: Vec<Option<SequenceId>>,
    /// Id assigned to the next insert
    next_id: SequenceId,
    stats: PayloadStoreStats,
}

impl PayloadStore {
    /// Allocates a store for the given configuration.
    pub fn new(config: &TrimConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let capacity = config.store_capacity;
        Ok(Self {
            space: config.sequence_space(),
            slot_size: config.max_payload,
            data: vec![0u8; capacity * config.max_payload],
            lens: vec![0; capacity],
            owners: vec![None; capacity],
            next_id: SequenceId::ZERO,
            stats: PayloadStoreStats::default(),
        })
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.owners.len()
    }

    /// Returns the maximum payload size per slot.
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Returns the id the next insert will be assigned.
    pub fn next_id(&self) -> SequenceId {
        self.next_id
    }

    /// Returns the SequenceId space this store evaluates residency in.
    pub fn space(&self) -> &SequenceSpace {
        &self.space
    }

    /// Returns store statistics.
    pub fn stats(&self) -> &PayloadStoreStats {
        &self.stats
    }

    fn slot(&self, id: SequenceId) -> usize {
        (id.get() % self.capacity() as u64) as usize
    }

    /// Copies `bytes` into the slot for the next id and advances the
    /// counter. Returns the id the payload was stored under.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<SequenceId, StoreError> {
        if bytes.len() > self.slot_size {
            return Err(StoreError::PayloadTooLarge {
                len: bytes.len(),
                slot_size: self.slot_size,
            });
        }

        let id = self.next_id;
        let slot = self.slot(id);
        let start = slot * self.slot_size;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.lens[slot] = bytes.len() as u32;
        if self.owners[slot].replace(id).is_some() {
            self.stats.overwritten += 1;
        }
        self.stats.inserted += 1;
        self.stats.bytes_inserted += bytes.len() as u64;
        self.next_id = self.space.next(id);

        trace!(id = %id, slot, len = bytes.len(), "Stored payload");
        Ok(id)
    }

    /// Returns true if `id` passes the validity rule against this store.
    pub fn is_resident(&self, id: SequenceId) -> bool {
        self.space.is_resident(self.next_id, id)
    }

    /// Returns the payload stored under `id`, or `None` if it has been
    /// evicted or was never written.
    pub fn get(&self, id: SequenceId) -> Option<&[u8]> {
        if !self.is_resident(id) {
            return None;
        }
        let slot = self.slot(id);
        if self.owners[slot] != Some(id) {
            return None;
        }
        let start = slot * self.slot_size;
        Some(&self.data[start..start + self.lens[slot] as usize])
    }

    /// Forgets every payload and restarts numbering at zero.
    pub fn clear(&mut self) {
        self.lens.fill(0);
        self.owners.fill(None);
        self.next_id = SequenceId::ZERO;
        self.stats = PayloadStoreStats::default();
    }
}
