//! Bidirectional match expansion around a fingerprint hit.
//!
//! A fingerprint hit only says two 64-byte windows probably hold the same
//! bytes. The expander confirms the windows are equal and then grows the
//! match outwards one byte at a time on both sides, producing the largest
//! contiguous span shared by the current payload and the stored one.

use trim_core::{SequenceId, WINDOW_SIZE};

/// A duplicate span between the current payload and a stored payload.
///
/// All offsets are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShimRegion {
    /// Stored payload the span was found in
    pub ref_id: SequenceId,
    /// First duplicated byte in the current payload
    pub orig_left: usize,
    /// Last duplicated byte in the current payload
    pub orig_right: usize,
    /// First duplicated byte in the stored payload
    pub stored_left: usize,
    /// Last duplicated byte in the stored payload
    pub stored_right: usize,
}

impl ShimRegion {
    /// Number of duplicated bytes.
    pub fn span_len(&self) -> usize {
        self.orig_right - self.orig_left + 1
    }
}

/// A stored payload proposed by the fingerprint index.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Id the payload was stored under
    pub id: SequenceId,
    /// Stored payload bytes
    pub bytes: &'a [u8],
    /// Offset of the matching window in `bytes`
    pub offset: usize,
}

/// Grows fingerprint hits into maximal duplicate spans.
#[derive(Debug, Clone, Copy)]
pub struct MatchExpander {
    window: usize,
}

impl Default for MatchExpander {
    fn default() -> Self {
        Self::new(WINDOW_SIZE)
    }
}

impl MatchExpander {
    /// Creates an expander for windows of `window` bytes.
    pub const fn new(window: usize) -> Self {
        Self { window }
    }

    /// Expands the window starting at `window_start` in `current` against
    /// `candidate`.
    ///
    /// Returns `None` when the candidate is the current payload itself, when
    /// either window is out of bounds, or when the windows differ (a
    /// fingerprint collision).
    pub fn expand(
        &self,
        current: &[u8],
        current_id: SequenceId,
        window_start: usize,
        candidate: Candidate<'_>,
    ) -> Option<ShimRegion> {
        if candidate.id == current_id {
            return None;
        }

        let ours = current.get(window_start..window_start + self.window)?;
        let theirs = candidate
            .bytes
            .get(candidate.offset..candidate.offset + self.window)?;
        if ours != theirs {
            return None;
        }

        let left = current[..window_start]
            .iter()
            .rev()
            .zip(candidate.bytes[..candidate.offset].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();

        let ours_end = window_start + self.window;
        let theirs_end = candidate.offset + self.window;
        let right = current[ours_end..]
            .iter()
            .zip(&candidate.bytes[theirs_end..])
            .take_while(|(a, b)| a == b)
            .count();

        Some(ShimRegion {
            ref_id: candidate.id,
            orig_left: window_start - left,
            orig_right: ours_end - 1 + right,
            stored_left: candidate.offset - left,
            stored_right: theirs_end - 1 + right,
        })
    }

    /// Replaces `best` with `region` if `region` is strictly longer.
    pub fn offer(best: &mut Option<ShimRegion>, region: ShimRegion) -> bool {
        let longer = best.map_or(true, |held| region.span_len() > held.span_len());
        if longer {
            *best = Some(region);
        }
        longer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    #[test]
    fn test_expands_both_directions() {
        let stored = pattern(200, 3);
        let mut current = pattern(200, 100);
        current[50..170].copy_from_slice(&stored[30..150]);

        let region = MatchExpander::default()
            .expand(
                &current,
                SequenceId(2),
                80,
                Candidate {
                    id: SequenceId(1),
                    bytes: &stored,
                    offset: 60,
                },
            )
            .unwrap();

        assert_eq!(region.orig_left, 50);
        assert_eq!(region.orig_right, 169);
        assert_eq!(region.stored_left, 30);
        assert_eq!(region.stored_right, 149);
        assert_eq!(region.span_len(), 120);
    }

    #[test]
    fn test_expansion_stops_at_payload_edges() {
        let stored = pattern(100, 9);
        let current = stored.clone();
        let region = MatchExpander::default()
            .expand(
                &current,
                SequenceId(5),
                10,
                Candidate {
                    id: SequenceId(4),
                    bytes: &stored,
                    offset: 10,
                },
            )
            .unwrap();
        assert_eq!((region.orig_left, region.orig_right), (0, 99));
        assert_eq!((region.stored_left, region.stored_right), (0, 99));
    }

    #[test]
    fn test_rejects_self_match() {
        let data = pattern(128, 1);
        let hit = MatchExpander::default().expand(
            &data,
            SequenceId(7),
            0,
            Candidate {
                id: SequenceId(7),
                bytes: &data,
                offset: 0,
            },
        );
        assert_eq!(hit, None);
    }

    #[test]
    fn test_rejects_collision_and_out_of_bounds() {
        let stored = pattern(128, 1);
        let current = pattern(128, 2);
        let expander = MatchExpander::default();
        let candidate = Candidate {
            id: SequenceId(0),
            bytes: &stored,
            offset: 0,
        };
        assert_eq!(expander.expand(&current, SequenceId(1), 0, candidate), None);
        let candidate = Candidate {
            offset: 100,
            ..candidate
        };
        assert_eq!(expander.expand(&stored, SequenceId(1), 0, candidate), None);
    }

    #[test]
    fn test_offer_keeps_strictly_longer() {
        let region = |len: usize| ShimRegion {
            ref_id: SequenceId(0),
            orig_left: 0,
            orig_right: len - 1,
            stored_left: 0,
            stored_right: len - 1,
        };
        let mut best = None;
        assert!(MatchExpander::offer(&mut best, region(70)));
        assert!(!MatchExpander::offer(&mut best, region(70)));
        assert!(!MatchExpander::offer(&mut best, region(64)));
        assert!(MatchExpander::offer(&mut best, region(90)));
        assert_eq!(best.map(|r| r.span_len()), Some(90));
    }
}
