//! Polynomial arithmetic over GF(2).
//!
//! A `u64` holds the coefficients of a polynomial of degree below 64, bit
//! `i` being the coefficient of `x^i`. Products are 128 bits wide and are
//! carried as a `(high, low)` pair.

const MSB: u64 = 1 << 63;

/// Degree of a non-zero polynomial.
fn degree(p: u64) -> u32 {
    63 - p.leading_zeros()
}

/// Reduces the 128-bit polynomial `high:low` modulo `d`.
///
/// `d` must be non-zero.
pub fn polymod(mut high: u64, mut low: u64, d: u64) -> u64 {
    debug_assert!(d != 0, "modulus polynomial must be non-zero");
    let k = degree(d);
    let d = d << (63 - k);

    if high != 0 {
        if high & MSB != 0 {
            high ^= d;
        }
        for i in (0..63).rev() {
            if high & (1 << i) != 0 {
                high ^= d >> (63 - i);
                low ^= d << (i + 1);
            }
        }
    }
    for i in (k..64).rev() {
        if low & (1 << i) != 0 {
            low ^= d >> (63 - i);
        }
    }
    low
}

/// Carry-less product of `x` and `y` as `(high, low)`.
pub fn polymult(x: u64, y: u64) -> (u64, u64) {
    let mut high = 0u64;
    let mut low = if x & 1 != 0 { y } else { 0 };
    for i in 1..64 {
        if x & (1 << i) != 0 {
            high ^= y >> (64 - i);
            low ^= y << i;
        }
    }
    (high, low)
}

/// Product of `x` and `y` modulo `d`.
pub fn polymmult(x: u64, y: u64, d: u64) -> u64 {
    let (high, low) = polymult(x, y);
    polymod(high, low, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polymult_small() {
        // (x + 1)(x + 1) = x^2 + 1 over GF(2)
        assert_eq!(polymult(0b11, 0b11), (0, 0b101));
        assert_eq!(polymult(0, 0xdead_beef), (0, 0));
        assert_eq!(polymult(1, 0xdead_beef), (0, 0xdead_beef));
    }

    #[test]
    fn test_polymult_high_word() {
        // x^63 * x = x^64
        assert_eq!(polymult(MSB, 0b10), (1, 0));
    }

    #[test]
    fn test_polymod_reduces_below_degree() {
        let d = crate::FINGERPRINT_POLY;
        for v in [u64::MAX, MSB, 0x1234_5678_9abc_def0] {
            assert!(polymod(0, v, d) < MSB);
            assert!(polymod(v, v, d) < MSB);
        }
        // Already reduced values are unchanged.
        assert_eq!(polymod(0, 0x42, d), 0x42);
    }

    #[test]
    fn test_polymod_small_modulus() {
        // x^3 mod (x^2 + x + 1) = 1
        assert_eq!(polymod(0, 0b1000, 0b111), 1);
        // x^2 mod (x^2 + x + 1) = x + 1
        assert_eq!(polymod(0, 0b100, 0b111), 0b11);
    }

    #[test]
    fn test_polymmult_distributes() {
        let d = crate::FINGERPRINT_POLY;
        let (a, b, c) = (0x0123_4567_89ab_cdef, 0x0fed_cba9_8765_4321, 0x1111_2222_3333_4444);
        assert_eq!(polymmult(a, b ^ c, d), polymmult(a, b, d) ^ polymmult(a, c, d));
    }
}
