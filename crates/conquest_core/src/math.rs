//! Fixed-point math utilities for deterministic simulation.
//!
//! Ratios (troop split, attack ratio, construction progress) use
//! fixed-point arithmetic so every client computes identical values.
//! Floating-point operations can produce different results on
//! different CPUs.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Build a fixed-point ratio from a per-mille integer (`250` → `0.25`).
#[must_use]
pub fn permille(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(1000)
}

/// Convert a ratio back to per-mille, clamped to `0..=1000`.
#[must_use]
pub fn to_permille(value: Fixed) -> u32 {
    let scaled = (value * Fixed::from_num(1000)).round();
    scaled.to_num::<i64>().clamp(0, 1000) as u32
}

/// Multiply an integer quantity by a ratio, rounding down.
///
/// The fraction is taken as accurate to one ulp, so a ratio built by
/// [`permille`] scales exactly: 20% of 2500 is 500, not 499.
/// Negative ratios yield zero.
#[must_use]
pub fn scale(quantity: u64, ratio: Fixed) -> u64 {
    if ratio <= Fixed::ZERO {
        return 0;
    }
    let whole = ratio.int().to_num::<u64>();
    let frac_bits = ratio.frac().to_bits() as u64;
    // frac part is a 32-bit binary fraction
    let frac = if frac_bits == 0 {
        0
    } else {
        ((u128::from(quantity) * u128::from(frac_bits + 1)) >> 32) as u64
    };
    quantity.saturating_mul(whole).saturating_add(frac)
}

/// `num / den` as a fixed-point ratio. A zero denominator yields zero.
#[must_use]
pub fn ratio(num: u64, den: u64) -> Fixed {
    if den == 0 {
        return Fixed::ZERO;
    }
    let num = num.min(i32::MAX as u64);
    let den = den.min(i32::MAX as u64);
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Sixteen compass directions as per-mille unit vectors (x, y).
///
/// Replaces trigonometry so radial sampling stays integer-only.
pub const UNIT_CIRCLE_16: [(i32, i32); 16] = [
    (1000, 0),
    (924, 383),
    (707, 707),
    (383, 924),
    (0, 1000),
    (-383, 924),
    (-707, 707),
    (-924, 383),
    (-1000, 0),
    (-924, -383),
    (-707, -707),
    (-383, -924),
    (0, -1000),
    (383, -924),
    (707, -707),
    (924, -383),
];

/// Integer square root (floor).
#[must_use]
pub fn isqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    let mut low = 0u64;
    let mut high = value.min(u64::from(u32::MAX));
    while low < high {
        let mid = (low + high + 1) / 2;
        if mid.saturating_mul(mid) <= value {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permille_round_trip_is_exact_for_common_ratios() {
        for value in [0, 200, 250, 500, 750, 1000] {
            assert_eq!(to_permille(permille(value)), value);
        }
    }

    #[test]
    fn test_scale_rounds_down() {
        assert_eq!(scale(1000, permille(250)), 250);
        assert_eq!(scale(3, permille(500)), 1);
        assert_eq!(scale(10, Fixed::from_num(2)), 20);
        assert_eq!(scale(10, Fixed::from_num(-1)), 0);
    }

    #[test]
    fn test_scale_is_exact_for_permille_ratios() {
        assert_eq!(scale(2500, permille(200)), 500);
        assert_eq!(scale(10, permille(700)), 7);
        for pm in 0..=1000 {
            assert_eq!(scale(1000, permille(pm)), u64::from(pm), "{pm} per mille");
        }
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(5, 0), Fixed::ZERO);
        assert_eq!(ratio(1, 4), permille(250));
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(1_000_000), 1000);
    }

    #[test]
    fn test_unit_circle_lengths_are_close_to_one() {
        for (x, y) in UNIT_CIRCLE_16 {
            let len_sq = (x * x + y * y) as u64;
            assert!((990_000..=1_010_000).contains(&len_sq), "({x}, {y})");
        }
    }
}
