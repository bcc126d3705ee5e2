//! Constant-product liquidity pool state.
//!
//! A [`Pair`] holds the recorded reserves of two tokens, the price
//! accumulators used for time-weighted average prices, the protocol fee
//! snapshot and the ledger of liquidity shares. The entry points that move
//! tokens (`mint`, `burn`, `swap`, `skim`, `sync`) live on
//! [`PoolManager`](crate::PoolManager), which owns token balances; this module
//! provides the bookkeeping they share.

use crate::erc20::{Erc20, TokenError};
use crate::math;
use crate::types::{block_timestamp_u32, fits_u112, Address, Amount, TokenId, U256};
use crate::uq112x112::UQ112x112;
use tracing::debug;

/// Errors raised by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairError {
    #[error("pair is locked")]
    Locked,

    #[error("forbidden")]
    Forbidden,

    #[error("pair already initialized")]
    AlreadyInitialized,

    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("invalid to")]
    InvalidTo,

    #[error("constant product invariant violated")]
    K,

    #[error("reserve overflow")]
    Overflow,

    #[error("liquidity share error: {0}")]
    Shares(#[from] TokenError),
}

/// Snapshot of a pool's reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reserves {
    pub reserve0: Amount,
    pub reserve1: Amount,
    /// 32-bit timestamp of the last reserve update.
    pub block_timestamp_last: u32,
}

/// A two-token liquidity pool.
#[derive(Debug, Clone)]
pub struct Pair {
    address: Address,
    factory: Address,
    token0: TokenId,
    token1: TokenId,
    initialized: bool,
    reserve0: Amount,
    reserve1: Amount,
    block_timestamp_last: u32,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    /// reserve0 * reserve1 as of the most recent liquidity event, zero while the protocol fee is off.
    k_last: U256,
    shares: Erc20,
    unlocked: bool,
}

impl Pair {
    /// A freshly deployed, uninitialized pool.
    pub fn new(address: Address, factory: Address) -> Self {
        Self {
            address,
            factory,
            token0: Address::ZERO,
            token1: Address::ZERO,
            initialized: false,
            reserve0: U256::ZERO,
            reserve1: U256::ZERO,
            block_timestamp_last: 0,
            price0_cumulative_last: U256::ZERO,
            price1_cumulative_last: U256::ZERO,
            k_last: U256::ZERO,
            shares: Erc20::new(),
            unlocked: true,
        }
    }

    /// Bind the pool to its tokens. Only the deploying factory may call this, once.
    pub fn initialize(
        &mut self,
        caller: Address,
        token0: TokenId,
        token1: TokenId,
    ) -> Result<(), PairError> {
        if caller != self.factory {
            return Err(PairError::Forbidden);
        }
        if self.initialized {
            return Err(PairError::AlreadyInitialized);
        }
        self.token0 = token0;
        self.token1 = token1;
        self.initialized = true;
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn token0(&self) -> TokenId {
        self.token0
    }

    pub fn token1(&self) -> TokenId {
        self.token1
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn get_reserves(&self) -> Reserves {
        Reserves {
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            block_timestamp_last: self.block_timestamp_last,
        }
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.price1_cumulative_last
    }

    pub fn k_last(&self) -> U256 {
        self.k_last
    }

    /// Check if this pair contains the given token.
    pub fn contains(&self, token: TokenId) -> bool {
        self.token0 == token || self.token1 == token
    }

    /// Get the other token in the pair.
    pub fn other_token(&self, token: TokenId) -> Option<TokenId> {
        if self.token0 == token {
            Some(self.token1)
        } else if self.token1 == token {
            Some(self.token0)
        } else {
            None
        }
    }

    /// The liquidity share ledger.
    pub fn shares(&self) -> &Erc20 {
        &self.shares
    }

    pub(crate) fn shares_mut(&mut self) -> &mut Erc20 {
        &mut self.shares
    }

    pub fn total_supply(&self) -> Amount {
        self.shares.total_supply()
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub(crate) fn set_unlocked(&mut self, unlocked: bool) {
        self.unlocked = unlocked;
    }

    /// Record new reserves from balances and, on the first update of a time
    /// unit, accumulate the prior reserves' prices.
    pub(crate) fn update(
        &mut self,
        balance0: Amount,
        balance1: Amount,
        now: u64,
    ) -> Result<(), PairError> {
        if !fits_u112(balance0) || !fits_u112(balance1) {
            return Err(PairError::Overflow);
        }
        let block_timestamp = block_timestamp_u32(now);
        let time_elapsed = block_timestamp.wrapping_sub(self.block_timestamp_last);
        if time_elapsed > 0 && !self.reserve0.is_zero() && !self.reserve1.is_zero() {
            let elapsed = U256::from(time_elapsed);
            // Reserves are bounded to 112 bits, so encoding cannot fail and the
            // 224-bit quotient times a 32-bit interval cannot overflow 256 bits.
            let price0 = UQ112x112::encode(self.reserve1)
                .and_then(|p| p.uqdiv(self.reserve0))
                .ok_or(PairError::Overflow)?;
            let price1 = UQ112x112::encode(self.reserve0)
                .and_then(|p| p.uqdiv(self.reserve1))
                .ok_or(PairError::Overflow)?;
            self.price0_cumulative_last = self
                .price0_cumulative_last
                .wrapping_add(price0.into_inner() * elapsed);
            self.price1_cumulative_last = self
                .price1_cumulative_last
                .wrapping_add(price1.into_inner() * elapsed);
        }
        self.reserve0 = balance0;
        self.reserve1 = balance1;
        self.block_timestamp_last = block_timestamp;
        debug!(
            pair = %self.address,
            reserve0 = %balance0,
            reserve1 = %balance1,
            "reserves synced"
        );
        Ok(())
    }

    /// Mint the protocol's share of invariant growth since the last liquidity event.
    ///
    /// Returns whether the protocol fee is on. The fee equals 1/6 of the growth
    /// in `sqrt(k)`, paid in newly minted liquidity shares to `fee_to`.
    pub(crate) fn mint_fee(&mut self, fee_to: Address) -> Result<bool, PairError> {
        let fee_on = !fee_to.is_zero();
        if fee_on {
            if !self.k_last.is_zero() {
                let root_k = math::sqrt(self.reserve0 * self.reserve1);
                let root_k_last = math::sqrt(self.k_last);
                if root_k > root_k_last {
                    let numerator = self
                        .total_supply()
                        .checked_mul(root_k - root_k_last)
                        .ok_or(PairError::Overflow)?;
                    let denominator = root_k * U256::from(5) + root_k_last;
                    let liquidity = numerator / denominator;
                    if !liquidity.is_zero() {
                        debug!(pair = %self.address, %fee_to, %liquidity, "protocol fee minted");
                        self.shares.mint(fee_to, liquidity)?;
                    }
                }
            }
        } else if !self.k_last.is_zero() {
            self.k_last = U256::ZERO;
        }
        Ok(fee_on)
    }

    /// Snapshot `k` after a liquidity event while the protocol fee is on.
    pub(crate) fn snapshot_k(&mut self) {
        self.k_last = self.reserve0 * self.reserve1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uq112x112::Q112;

    fn factory() -> Address {
        Address::repeat_byte(0xFA)
    }

    fn new_pair() -> Pair {
        let mut pair = Pair::new(Address::repeat_byte(0x99), factory());
        pair.initialize(factory(), Address::repeat_byte(0x01), Address::repeat_byte(0x02))
            .unwrap();
        pair
    }

    #[test]
    fn test_initialize_once_by_factory() {
        let mut pair = Pair::new(Address::repeat_byte(0x99), factory());
        assert_eq!(
            pair.initialize(Address::repeat_byte(0x01), Address::ZERO, Address::ZERO),
            Err(PairError::Forbidden)
        );
        pair.initialize(factory(), Address::repeat_byte(0x01), Address::repeat_byte(0x02))
            .unwrap();
        assert!(pair.is_initialized());
        assert_eq!(
            pair.initialize(factory(), Address::repeat_byte(0x03), Address::repeat_byte(0x04)),
            Err(PairError::AlreadyInitialized)
        );
        assert_eq!(pair.token0(), Address::repeat_byte(0x01));
    }

    #[test]
    fn test_other_token() {
        let pair = new_pair();
        assert!(pair.contains(Address::repeat_byte(0x01)));
        assert_eq!(
            pair.other_token(Address::repeat_byte(0x01)),
            Some(Address::repeat_byte(0x02))
        );
        assert_eq!(pair.other_token(Address::repeat_byte(0x07)), None);
    }

    #[test]
    fn test_update_accumulates_prices() {
        let mut pair = new_pair();
        pair.update(U256::from(100), U256::from(200), 1_000).unwrap();
        // First update from empty reserves accumulates nothing.
        assert_eq!(pair.price0_cumulative_last(), U256::ZERO);

        pair.update(U256::from(100), U256::from(200), 1_010).unwrap();
        assert_eq!(pair.price0_cumulative_last(), Q112 * U256::from(2) * U256::from(10));
        assert_eq!(pair.price1_cumulative_last(), Q112 / U256::from(2) * U256::from(10));

        // Same timestamp: no accumulation.
        pair.update(U256::from(300), U256::from(300), 1_010).unwrap();
        assert_eq!(pair.price0_cumulative_last(), Q112 * U256::from(20));
        assert_eq!(pair.get_reserves().block_timestamp_last, 1_010);
    }

    #[test]
    fn test_update_rejects_reserve_overflow() {
        let mut pair = new_pair();
        let too_big = U256::from(1) << 112;
        assert_eq!(
            pair.update(too_big, U256::from(1), 1),
            Err(PairError::Overflow)
        );
        assert_eq!(pair.get_reserves(), Reserves::default());
    }

    #[test]
    fn test_mint_fee_off_clears_k_last() {
        let mut pair = new_pair();
        pair.update(U256::from(1_000), U256::from(1_000), 1).unwrap();
        pair.snapshot_k();
        assert_eq!(pair.k_last(), U256::from(1_000_000));
        assert!(!pair.mint_fee(Address::ZERO).unwrap());
        assert_eq!(pair.k_last(), U256::ZERO);
    }
}
