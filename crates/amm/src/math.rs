//! Integer helpers shared by the pool and pricing code.

use crate::types::U256;

/// Integer square root (Babylonian method), rounded down.
pub fn sqrt(y: U256) -> U256 {
    if y > U256::from(3) {
        let mut z = y;
        let mut x = y / U256::from(2) + U256::from(1);
        while x < z {
            z = x;
            x = (y / x + x) / U256::from(2);
        }
        z
    } else if !y.is_zero() {
        U256::from(1)
    } else {
        U256::ZERO
    }
}

/// Smaller of two values.
pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}
