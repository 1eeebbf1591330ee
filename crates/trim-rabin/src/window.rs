//! Rolling window over the last [`WINDOW_SIZE`] bytes.

use std::sync::LazyLock;

use crate::poly::{polymmult, polymod};
use crate::{FINGERPRINT_POLY, WINDOW_SIZE};

/// Pre-computed tables for [`FINGERPRINT_POLY`] (computed once at runtime).
pub static RABIN_TABLES: LazyLock<RabinTables> =
    LazyLock::new(|| RabinTables::new(FINGERPRINT_POLY, WINDOW_SIZE));

/// Append and removal tables for one polynomial and window size.
#[derive(Clone)]
pub struct RabinTables {
    /// Reduction of the byte shifted out of the top on append
    append: [u64; 256],
    /// Contribution of a byte leaving the window
    remove: [u64; 256],
    /// Shift that exposes the top byte of a reduced fingerprint
    shift: u32,
}

impl RabinTables {
    /// Builds the tables for polynomial `poly` of degree at least 8.
    pub fn new(poly: u64, window: usize) -> Self {
        assert!(poly >= 0x100, "polynomial degree must be at least 8");
        assert!(window > 0, "window must be non-empty");

        let xshift = 63 - poly.leading_zeros();
        let shift = xshift - 8;
        let top = polymod(0, 1 << xshift, poly);

        let mut append = [0u64; 256];
        for (j, entry) in append.iter_mut().enumerate() {
            *entry = polymmult(j as u64, top, poly) | ((j as u64) << xshift);
        }

        let mut tables = Self {
            append,
            remove: [0u64; 256],
            shift,
        };

        // x^(8 * (window - 1)) mod poly
        let mut size_shift = 1u64;
        for _ in 1..window {
            size_shift = tables.append8(size_shift, 0);
        }
        for (j, entry) in tables.remove.iter_mut().enumerate() {
            *entry = polymmult(j as u64, size_shift, poly);
        }
        tables
    }

    /// Multiplies `p` by `x^8` and adds `m`, modulo the polynomial.
    #[inline]
    pub fn append8(&self, p: u64, m: u8) -> u64 {
        ((p << 8) | u64::from(m)) ^ self.append[((p >> self.shift) & 0xff) as usize]
    }

    /// Fingerprint of `bytes` taken as a whole.
    pub fn fingerprint(&self, bytes: &[u8]) -> u64 {
        bytes.iter().fold(0, |p, &m| self.append8(p, m))
    }
}

/// Rabin fingerprint over the trailing window of a byte stream.
///
/// Until the window has seen [`WINDOW_SIZE`] bytes the missing positions
/// count as zero bytes, which contribute nothing to the fingerprint.
pub struct RabinWindow {
    tables: &'static RabinTables,
    buf: [u8; WINDOW_SIZE],
    pos: usize,
    fingerprint: u64,
}

impl RabinWindow {
    /// Creates an empty window using the shared tables.
    pub fn new() -> Self {
        Self {
            tables: &*RABIN_TABLES,
            buf: [0u8; WINDOW_SIZE],
            pos: 0,
            fingerprint: 0,
        }
    }

    /// Feeds one byte and returns the fingerprint of the trailing window.
    #[inline]
    pub fn slide(&mut self, m: u8) -> u64 {
        let old = self.buf[self.pos];
        self.buf[self.pos] = m;
        self.pos = (self.pos + 1) % WINDOW_SIZE;
        self.fingerprint = self
            .tables
            .append8(self.fingerprint ^ self.tables.remove[usize::from(old)], m);
        self.fingerprint
    }

    /// Returns the current fingerprint.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Clears all accumulated state.
    pub fn reset(&mut self) {
        self.buf = [0u8; WINDOW_SIZE];
        self.pos = 0;
        self.fingerprint = 0;
    }
}

impl Default for RabinWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random(len: usize, mut state: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn test_rolling_matches_fresh_window() {
        let data = pseudo_random(300, 0x12345678);
        let mut rolling = RabinWindow::new();
        for (i, &b) in data.iter().enumerate() {
            let fp = rolling.slide(b);
            if i + 1 >= WINDOW_SIZE {
                let mut fresh = RabinWindow::new();
                let mut expected = 0;
                for &w in &data[i + 1 - WINDOW_SIZE..=i] {
                    expected = fresh.slide(w);
                }
                assert_eq!(fp, expected, "fingerprint mismatch at byte {}", i);
            }
        }
    }

    #[test]
    fn test_window_matches_direct_fingerprint() {
        let data = pseudo_random(WINDOW_SIZE * 3, 0x9e3779b9);
        let mut window = RabinWindow::new();
        for &b in &data {
            window.slide(b);
        }
        let tail = &data[data.len() - WINDOW_SIZE..];
        assert_eq!(window.fingerprint(), RABIN_TABLES.fingerprint(tail));
    }

    #[test]
    fn test_fingerprint_stays_reduced() {
        let data = pseudo_random(4096, 42);
        let mut window = RabinWindow::new();
        for &b in &data {
            assert!(window.slide(b) < 1 << 63);
        }
    }

    #[test]
    fn test_same_content_same_fingerprint_at_any_offset() {
        let shared = pseudo_random(WINDOW_SIZE, 7);
        let mut a = pseudo_random(100, 1);
        a.extend_from_slice(&shared);
        let mut b = pseudo_random(37, 2);
        b.extend_from_slice(&shared);

        let mut wa = RabinWindow::new();
        let fa = a.iter().map(|&x| wa.slide(x)).last().unwrap();
        let mut wb = RabinWindow::new();
        let fb = b.iter().map(|&x| wb.slide(x)).last().unwrap();
        assert_eq!(fa, fb);
    }

    #[test]
    fn test_reset_clears_state() {
        let data = pseudo_random(200, 3);
        let mut window = RabinWindow::new();
        let first: Vec<u64> = data.iter().map(|&b| window.slide(b)).collect();
        window.reset();
        assert_eq!(window.fingerprint(), 0);
        let second: Vec<u64> = data.iter().map(|&b| window.slide(b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_windows_differ() {
        let mut window = RabinWindow::new();
        let a = (0..WINDOW_SIZE).map(|_| window.slide(0x11)).last().unwrap();
        window.reset();
        let b = (0..WINDOW_SIZE).map(|_| window.slide(0x12)).last().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_append_table_cancels_top_bit() {
        let tables = &*RABIN_TABLES;
        assert_eq!(tables.shift, 55);
        for j in 0..256 {
            assert!(tables.append[j] >> 63 == (j as u64 & 1));
        }
    }
}
