//! UQ112x112 binary fixed-point numbers used by the price accumulators.
//!
//! A reserve fits in 112 bits; encoding shifts it left by 112 so that the
//! quotient of two reserves keeps 112 fractional bits inside 224 bits.

use crate::types::{fits_u112, U256};
use std::fmt;

/// Number of fractional bits.
pub const RESOLUTION: usize = 112;

/// 2^112, the fixed-point representation of 1.
pub const Q112: U256 = U256::from_limbs([0, 1 << 48, 0, 0]);

/// An unsigned fixed-point number with 112 integer and 112 fractional bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UQ112x112(U256);

impl UQ112x112 {
    /// Encode a 112-bit integer as a fixed-point value.
    ///
    /// Returns `None` if `y` does not fit in 112 bits.
    pub fn encode(y: U256) -> Option<Self> {
        if !fits_u112(y) {
            return None;
        }
        // Never overflows: y < 2^112, so y * 2^112 < 2^224.
        Some(Self(y * Q112))
    }

    /// Divide by a 112-bit integer, returning `None` on division by zero.
    pub fn uqdiv(self, y: U256) -> Option<Self> {
        self.0.checked_div(y).map(Self)
    }

    /// Integer part of the fixed-point value.
    pub fn decode(self) -> U256 {
        self.0 >> RESOLUTION
    }

    /// The raw 224-bit representation.
    pub fn into_inner(self) -> U256 {
        self.0
    }

    /// Wrap a raw representation (e.g. the difference of two accumulators).
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Convert to f64 for display purposes (may lose precision).
    pub fn to_f64(self) -> f64 {
        let integer: u128 = self.decode().try_into().unwrap_or(u128::MAX);
        let fraction: u128 = (self.0 & (Q112 - U256::from(1)))
            .try_into()
            .unwrap_or(0);
        integer as f64 + fraction as f64 / 2f64.powi(RESOLUTION as i32)
    }
}

impl fmt::Display for UQ112x112 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// Time-weighted average price between two accumulator observations.
///
/// Accumulators wrap, so the difference is taken modulo 2^256. Returns
/// `None` if no time has elapsed.
pub fn average_price(
    cumulative_start: U256,
    cumulative_end: U256,
    elapsed: u32,
) -> Option<UQ112x112> {
    if elapsed == 0 {
        return None;
    }
    let delta = cumulative_end.wrapping_sub(cumulative_start);
    Some(UQ112x112(delta / U256::from(elapsed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::U112_MAX;

    #[test]
    fn test_q112_is_two_pow_112() {
        assert_eq!(Q112, U256::from(1) << 112);
    }

    #[test]
    fn test_encode_decode() {
        let v = UQ112x112::encode(U256::from(42)).unwrap();
        assert_eq!(v.decode(), U256::from(42));
        assert!(UQ112x112::encode(U112_MAX).is_some());
        assert!(UQ112x112::encode(U112_MAX + U256::from(1)).is_none());
    }

    #[test]
    fn test_uqdiv_ratio() {
        // 3 / 2 = 1.5
        let v = UQ112x112::encode(U256::from(3))
            .unwrap()
            .uqdiv(U256::from(2))
            .unwrap();
        assert_eq!(v.decode(), U256::from(1));
        assert_eq!(v.to_f64(), 1.5);
        assert!(v.uqdiv(U256::ZERO).is_none());
    }

    #[test]
    fn test_average_price_handles_wraparound() {
        let price = UQ112x112::encode(U256::from(2)).unwrap().into_inner();
        let start = U256::MAX - price + U256::from(1);
        let end = start.wrapping_add(price * U256::from(10));
        let avg = average_price(start, end, 10).unwrap();
        assert_eq!(avg.decode(), U256::from(2));
        assert!(average_price(start, end, 0).is_none());
    }
}
