//! Sequence identifiers and the residency (validity) rule.
//!
//! Every stage numbers the payloads it processes with a counter that wraps
//! at a large modulus. A referenced id is usable only while it lies within
//! the last `window` ids before the stage's current counter. Both stages
//! evaluate the same rule so their histories stay mirrored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to each processed payload.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SequenceId(pub u64);

impl SequenceId {
    /// The first id handed out by a fresh stage.
    pub const ZERO: Self = Self(0);

    /// Creates an id from its raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequenceId({})", self.0)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SequenceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Modular arithmetic over the SequenceId space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    modulus: u64,
    window: u64,
    wire_space: u64,
}

impl SequenceSpace {
    /// Creates a space with the given modulus, residency window and wire
    /// reference modulus. Callers validate the relationship between the
    /// three through [`crate::TrimConfig::validate`].
    pub const fn new(modulus: u64, window: u64, wire_space: u64) -> Self {
        Self {
            modulus,
            window,
            wire_space,
        }
    }

    /// Returns the SequenceId modulus.
    pub const fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Returns the number of most recent ids that remain resident.
    pub const fn window(&self) -> u64 {
        self.window
    }

    /// Returns the id that follows `id`, wrapping at the modulus.
    pub fn next(&self, id: SequenceId) -> SequenceId {
        let next = id.0.saturating_add(1);
        if next >= self.modulus {
            SequenceId(0)
        } else {
            SequenceId(next)
        }
    }

    /// Number of ids handed out after `earlier` up to `current`.
    pub fn distance(&self, current: SequenceId, earlier: SequenceId) -> u64 {
        self.back_from(current.0 % self.modulus, earlier.0 % self.modulus)
    }

    /// `(c - e) mod modulus` for reduced `c` and `e`, without leaving the
    /// `u64` range for any modulus.
    fn back_from(&self, c: u64, e: u64) -> u64 {
        if c >= e {
            c - e
        } else {
            self.modulus - (e - c)
        }
    }

    /// The validity rule: `id` is resident relative to the next id to be
    /// assigned (`current`) iff it was one of the last `window` ids.
    pub fn is_resident(&self, current: SequenceId, id: SequenceId) -> bool {
        if id.0 >= self.modulus {
            return false;
        }
        let d = self.distance(current, id);
        d >= 1 && d <= self.window
    }

    /// Reduces an id to the value carried in a shim descriptor.
    pub fn to_wire(&self, id: SequenceId) -> u32 {
        (id.0 % self.wire_space) as u32
    }

    /// Resolves a wire reference to the most recent id below `current`
    /// carrying that residue. Returns `None` for values outside the wire
    /// space or a reference to `current` itself.
    pub fn from_wire(&self, current: SequenceId, wire: u32) -> Option<SequenceId> {
        let wire = u64::from(wire);
        if wire >= self.wire_space {
            return None;
        }
        let low = current.0 % self.wire_space;
        let back = if low >= wire {
            low - wire
        } else {
            self.wire_space - (wire - low)
        };
        if back == 0 {
            return None;
        }
        Some(SequenceId(self.back_from(current.0 % self.modulus, back % self.modulus)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SequenceSpace {
        SequenceSpace::new(1000, 10, 100)
    }

    #[test]
    fn test_next_wraps() {
        let s = space();
        assert_eq!(s.next(SequenceId(5)), SequenceId(6));
        assert_eq!(s.next(SequenceId(999)), SequenceId(0));
    }

    #[test]
    fn test_residency_window() {
        let s = space();
        let current = SequenceId(50);
        assert!(s.is_resident(current, SequenceId(49)));
        assert!(s.is_resident(current, SequenceId(40)));
        assert!(!s.is_resident(current, SequenceId(39)));
        // The id about to be assigned has not been written yet.
        assert!(!s.is_resident(current, SequenceId(50)));
        // Ids "from the future" look like distances close to the modulus.
        assert!(!s.is_resident(current, SequenceId(51)));
        assert!(!s.is_resident(current, SequenceId(5000)));
    }

    #[test]
    fn test_residency_across_wrap() {
        let s = space();
        let current = SequenceId(3);
        assert!(s.is_resident(current, SequenceId(2)));
        assert!(s.is_resident(current, SequenceId(999)));
        assert!(s.is_resident(current, SequenceId(993)));
        assert!(!s.is_resident(current, SequenceId(992)));
    }

    #[test]
    fn test_wire_resolution() {
        let s = space();
        let current = SequenceId(457);
        for back in 1..=10u64 {
            let id = SequenceId(current.0 - back);
            let wire = s.to_wire(id);
            assert_eq!(s.from_wire(current, wire), Some(id));
        }
        assert_eq!(s.from_wire(current, s.to_wire(current)), None);
        assert_eq!(s.from_wire(current, 100), None);
    }

    #[test]
    fn test_arithmetic_near_u64_max_modulus() {
        let s = SequenceSpace::new(u64::MAX, 3, 65535);
        let last = SequenceId(u64::MAX - 1);
        assert_eq!(s.next(last), SequenceId(0));

        let current = SequenceId(1);
        assert_eq!(s.distance(current, last), 2);
        assert!(s.is_resident(current, last));
        assert!(s.is_resident(current, SequenceId(u64::MAX - 2)));
        assert!(!s.is_resident(current, SequenceId(u64::MAX - 3)));

        let wire = s.to_wire(last);
        assert_eq!(wire, 65534);
        assert_eq!(s.from_wire(current, wire), Some(last));
        let older = SequenceId(u64::MAX - 3);
        assert_eq!(s.from_wire(last, s.to_wire(older)), Some(older));
    }

    #[test]
    fn test_wire_resolution_across_wrap() {
        let s = space();
        let current = SequenceId(2);
        let id = SequenceId(997);
        let wire = s.to_wire(id);
        assert_eq!(wire, 97);
        assert_eq!(s.from_wire(current, wire), Some(id));
    }
}
