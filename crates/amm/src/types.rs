//! Core type definitions for the exchange.
//!
//! Re-exports from alloy-primitives for Ethereum-compatible types.

pub use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::primitives::uint;

/// Unique identifier for a token (contract address).
pub type TokenId = Address;

/// Amount of tokens, represented as U256 to handle large token supplies.
/// This is in the smallest unit (e.g., wei for ETH, smallest decimal for ERC-20).
pub type Amount = U256;

/// Liquidity shares permanently locked at the null address on a pool's first mint.
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

/// Largest value a pool reserve may hold (2^112 - 1).
pub const U112_MAX: U256 = uint!(0xffffffffffffffffffffffffffff_U256);

/// Fee numerator applied to swap inputs (0.3% fee).
pub const FEE_NUMERATOR: u64 = 997;

/// Fee denominator applied to swap inputs.
pub const FEE_DENOMINATOR: u64 = 1_000;

/// Returns `true` if `value` fits in an unsigned 112-bit integer.
pub fn fits_u112(value: U256) -> bool {
    value <= U112_MAX
}

/// Truncate a unix timestamp to the 32-bit wraparound clock pools record.
pub fn block_timestamp_u32(timestamp: u64) -> u32 {
    (timestamp % (1u64 << 32)) as u32
}
