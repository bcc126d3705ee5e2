//! Pool manager: the simulated chain the pools run on.
//!
//! Owns token balances, the pair factory (and through it every pair), the
//! block clock, the registered flash-swap callees and the event journal.
//! Every state-mutating entry point is atomic: if it fails, all of its
//! effects (including nested calls made from a flash-swap callback) are
//! rolled back.

use crate::callee::FlashSwapCallee;
use crate::config::DexConfig;
use crate::erc20::{Erc20, TokenError};
use crate::events::Event;
use crate::factory::{Factory, FactoryError};
use crate::math;
use crate::pair::{Pair, PairError, Reserves};
use crate::pricing::{self, PricingError, ReserveSource};
use crate::types::{
    Address, Amount, TokenId, B256, FEE_DENOMINATOR, FEE_NUMERATOR, MINIMUM_LIQUIDITY, U256,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Errors that can occur in the pool manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Pair(#[from] PairError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("no pair deployed at {0}")]
    PairNotFound(Address),

    #[error("no token deployed at {0}")]
    UnknownToken(TokenId),

    #[error("token already deployed at {0}")]
    TokenExists(TokenId),

    #[error("no flash swap callee at {0}")]
    NoCallee(Address),

    #[error("callee already registered at {0}")]
    CalleeExists(Address),

    #[error("arithmetic overflow")]
    Overflow,
}

/// Everything that is rolled back when a call fails.
#[derive(Debug, Clone)]
struct ChainState {
    tokens: HashMap<TokenId, Erc20>,
    factory: Factory,
    events: Vec<Event>,
    block_timestamp: u64,
}

/// The main pool manager.
/// Manages token ledgers and all pairs, and executes pool operations atomically.
pub struct PoolManager {
    chain_id: u64,
    state: ChainState,
    callees: HashMap<Address, Box<dyn FlashSwapCallee>>,
}

impl PoolManager {
    /// Create a new pool manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(&DexConfig::default())
    }

    /// Create a new pool manager with custom configuration.
    pub fn with_config(config: &DexConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            state: ChainState {
                tokens: HashMap::new(),
                factory: Factory::new(config.factory_address, config.fee_to_setter),
                events: Vec::new(),
                block_timestamp: config.genesis_timestamp,
            },
            callees: HashMap::new(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn block_timestamp(&self) -> u64 {
        self.state.block_timestamp
    }

    pub fn set_block_timestamp(&mut self, timestamp: u64) {
        self.state.block_timestamp = timestamp;
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_time(&mut self, seconds: u64) {
        self.state.block_timestamp = self.state.block_timestamp.saturating_add(seconds);
    }

    pub fn factory(&self) -> &Factory {
        &self.state.factory
    }

    /// Get a pair by address.
    pub fn pair(&self, address: Address) -> Option<&Pair> {
        self.state.factory.pair(&address)
    }

    /// Events emitted since the journal was last drained.
    pub fn events(&self) -> &[Event] {
        &self.state.events
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.state.events)
    }

    /// Run `f` as one atomic unit: if it returns `Err`, every state change it
    /// made is discarded.
    ///
    /// Each call clones the whole chain state (every token ledger, every pair
    /// and the event journal), and scopes nest: an executor settlement pays
    /// for its own snapshot plus the pair lock's.
    pub fn transact<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.state.clone();
        let result = f(self);
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Deploy an empty token ledger at `token`.
    pub fn deploy_token(&mut self, token: TokenId) -> Result<(), PoolError> {
        if self.state.tokens.contains_key(&token) {
            return Err(PoolError::TokenExists(token));
        }
        self.state.tokens.insert(token, Erc20::new());
        debug!(%token, "token deployed");
        Ok(())
    }

    /// Create new units of `token` for `to`.
    pub fn mint_token(&mut self, token: TokenId, to: Address, amount: Amount) -> Result<(), PoolError> {
        self.token_mut(token)?.mint(to, amount)?;
        Ok(())
    }

    pub fn balance_of(&self, token: TokenId, owner: Address) -> Result<Amount, PoolError> {
        Ok(self.token(token)?.balance_of(owner))
    }

    pub fn allowance(
        &self,
        token: TokenId,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, PoolError> {
        Ok(self.token(token)?.allowance(owner, spender))
    }

    pub fn approve(
        &mut self,
        token: TokenId,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.token_mut(token)?.approve(owner, spender, amount);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        token: TokenId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.token_mut(token)?.transfer(from, to, amount)?;
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        token: TokenId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.token_mut(token)?
            .transfer_from(spender, from, to, amount)?;
        Ok(())
    }

    /// Like [`transfer_from`](Self::transfer_from), but reports failure as
    /// `false` instead of an error. Nothing moves when it fails.
    pub fn try_transfer_from(
        &mut self,
        token: TokenId,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> bool {
        match self.transfer_from(token, spender, from, to, amount) {
            Ok(()) => true,
            Err(err) => {
                debug!(%token, %from, %to, %amount, %err, "transfer attempt failed");
                false
            }
        }
    }

    fn token(&self, token: TokenId) -> Result<&Erc20, PoolError> {
        self.state
            .tokens
            .get(&token)
            .ok_or(PoolError::UnknownToken(token))
    }

    fn token_mut(&mut self, token: TokenId) -> Result<&mut Erc20, PoolError> {
        self.state
            .tokens
            .get_mut(&token)
            .ok_or(PoolError::UnknownToken(token))
    }

    // ------------------------------------------------------------------
    // Liquidity shares
    // ------------------------------------------------------------------

    pub fn share_balance_of(&self, pair: Address, owner: Address) -> Result<Amount, PoolError> {
        Ok(self.pair_ref(pair)?.shares().balance_of(owner))
    }

    pub fn total_supply(&self, pair: Address) -> Result<Amount, PoolError> {
        Ok(self.pair_ref(pair)?.total_supply())
    }

    pub fn transfer_shares(
        &mut self,
        pair: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.pair_mut(pair)?
            .shares_mut()
            .transfer(from, to, amount)?;
        Ok(())
    }

    pub fn approve_shares(
        &mut self,
        pair: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.pair_mut(pair)?
            .shares_mut()
            .approve(owner, spender, amount);
        Ok(())
    }

    pub fn transfer_shares_from(
        &mut self,
        pair: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), PoolError> {
        self.pair_mut(pair)?
            .shares_mut()
            .transfer_from(spender, from, to, amount)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Factory
    // ------------------------------------------------------------------

    /// Create a new trading pair. Returns the pair's address.
    pub fn create_pair(&mut self, token_a: TokenId, token_b: TokenId) -> Result<Address, PoolError> {
        self.transact(|pm| {
            let created = pm.state.factory.create_pair(token_a, token_b)?;
            pm.emit(Event::PairCreated {
                token0: created.token0,
                token1: created.token1,
                pair: created.pair,
                index: created.index,
            });
            Ok(created.pair)
        })
    }

    /// Check if a pair exists for the two tokens, in either order.
    pub fn get_pair(&self, token_a: TokenId, token_b: TokenId) -> Option<Address> {
        self.state.factory.get_pair(token_a, token_b)
    }

    pub fn set_fee_to(&mut self, caller: Address, fee_to: Address) -> Result<(), PoolError> {
        self.state.factory.set_fee_to(caller, fee_to)?;
        Ok(())
    }

    pub fn set_fee_to_setter(&mut self, caller: Address, fee_to_setter: Address) -> Result<(), PoolError> {
        self.state.factory.set_fee_to_setter(caller, fee_to_setter)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flash-swap callees
    // ------------------------------------------------------------------

    /// Install the contract code that answers swap callbacks sent to `address`.
    pub fn register_callee(
        &mut self,
        address: Address,
        callee: Box<dyn FlashSwapCallee>,
    ) -> Result<(), PoolError> {
        if self.callees.contains_key(&address) {
            return Err(PoolError::CalleeExists(address));
        }
        self.callees.insert(address, callee);
        Ok(())
    }

    fn call_flash_swap(
        &mut self,
        to: Address,
        pair: Address,
        sender: Address,
        amount0_out: Amount,
        amount1_out: Amount,
        data: &[u8],
    ) -> Result<(), PoolError> {
        let mut callee = self.callees.remove(&to).ok_or(PoolError::NoCallee(to))?;
        let result = callee.on_flash_swap(self, pair, sender, amount0_out, amount1_out, data);
        self.callees.insert(to, callee);
        result
    }

    // ------------------------------------------------------------------
    // Pair operations
    // ------------------------------------------------------------------

    /// Mint liquidity shares to `to` for tokens already transferred to the pair.
    pub fn mint(&mut self, caller: Address, pair: Address, to: Address) -> Result<Amount, PoolError> {
        self.locked(pair, |pm| {
            let fee_to = pm.state.factory.fee_to();
            let (token0, token1, reserves) = pm.pair_info(pair)?;
            let balance0 = pm.balance_of(token0, pair)?;
            let balance1 = pm.balance_of(token1, pair)?;
            let amount0 = balance0
                .checked_sub(reserves.reserve0)
                .ok_or(PoolError::Overflow)?;
            let amount1 = balance1
                .checked_sub(reserves.reserve1)
                .ok_or(PoolError::Overflow)?;

            let p = pm.pair_mut(pair)?;
            let fee_on = p.mint_fee(fee_to)?;
            let total_supply = p.total_supply();
            let liquidity = if total_supply.is_zero() {
                let minimum = U256::from(MINIMUM_LIQUIDITY);
                let root = math::sqrt(amount0.checked_mul(amount1).ok_or(PoolError::Overflow)?);
                if root <= minimum {
                    return Err(PairError::InsufficientLiquidityMinted.into());
                }
                // Permanently lock the first MINIMUM_LIQUIDITY shares.
                p.shares_mut().mint(Address::ZERO, minimum)?;
                root - minimum
            } else {
                math::min(
                    mul_div(amount0, total_supply, reserves.reserve0)?,
                    mul_div(amount1, total_supply, reserves.reserve1)?,
                )
            };
            if liquidity.is_zero() {
                return Err(PairError::InsufficientLiquidityMinted.into());
            }
            p.shares_mut().mint(to, liquidity)?;

            pm.update_reserves(pair, balance0, balance1)?;
            if fee_on {
                pm.pair_mut(pair)?.snapshot_k();
            }
            pm.emit(Event::Mint {
                pair,
                sender: caller,
                amount0,
                amount1,
            });
            info!(%pair, %to, %liquidity, %amount0, %amount1, "liquidity minted");
            Ok(liquidity)
        })
    }

    /// Burn the liquidity shares held by the pair itself, paying the
    /// underlying tokens to `to`.
    pub fn burn(
        &mut self,
        caller: Address,
        pair: Address,
        to: Address,
    ) -> Result<(Amount, Amount), PoolError> {
        self.locked(pair, |pm| {
            let fee_to = pm.state.factory.fee_to();
            let (token0, token1, _) = pm.pair_info(pair)?;
            let balance0 = pm.balance_of(token0, pair)?;
            let balance1 = pm.balance_of(token1, pair)?;

            let p = pm.pair_mut(pair)?;
            let liquidity = p.shares().balance_of(pair);
            let fee_on = p.mint_fee(fee_to)?;
            let total_supply = p.total_supply();
            if total_supply.is_zero() {
                return Err(PairError::InsufficientLiquidityBurned.into());
            }
            // Current balances, not reserves, so stray tokens are paid out pro rata.
            let amount0 = mul_div(liquidity, balance0, total_supply)?;
            let amount1 = mul_div(liquidity, balance1, total_supply)?;
            if amount0.is_zero() || amount1.is_zero() {
                return Err(PairError::InsufficientLiquidityBurned.into());
            }
            p.shares_mut().burn(pair, liquidity)?;

            pm.transfer(token0, pair, to, amount0)?;
            pm.transfer(token1, pair, to, amount1)?;
            let balance0 = pm.balance_of(token0, pair)?;
            let balance1 = pm.balance_of(token1, pair)?;

            pm.update_reserves(pair, balance0, balance1)?;
            if fee_on {
                pm.pair_mut(pair)?.snapshot_k();
            }
            pm.emit(Event::Burn {
                pair,
                sender: caller,
                amount0,
                amount1,
                to,
            });
            info!(%pair, %to, %liquidity, %amount0, %amount1, "liquidity burned");
            Ok((amount0, amount1))
        })
    }

    /// Send the requested outputs to `to`, optionally call its flash-swap
    /// callback, then require the fee-adjusted constant product to hold.
    pub fn swap(
        &mut self,
        caller: Address,
        pair: Address,
        amount0_out: Amount,
        amount1_out: Amount,
        to: Address,
        data: &[u8],
    ) -> Result<(), PoolError> {
        self.locked(pair, |pm| {
            if amount0_out.is_zero() && amount1_out.is_zero() {
                return Err(PairError::InsufficientOutputAmount.into());
            }
            let (token0, token1, reserves) = pm.pair_info(pair)?;
            let Reserves {
                reserve0, reserve1, ..
            } = reserves;
            if amount0_out >= reserve0 || amount1_out >= reserve1 {
                return Err(PairError::InsufficientLiquidity.into());
            }
            if to == token0 || to == token1 {
                return Err(PairError::InvalidTo.into());
            }

            // Optimistic transfer.
            if !amount0_out.is_zero() {
                pm.transfer(token0, pair, to, amount0_out)?;
            }
            if !amount1_out.is_zero() {
                pm.transfer(token1, pair, to, amount1_out)?;
            }
            if !data.is_empty() {
                pm.call_flash_swap(to, pair, caller, amount0_out, amount1_out, data)?;
            }
            let balance0 = pm.balance_of(token0, pair)?;
            let balance1 = pm.balance_of(token1, pair)?;

            let amount0_in = amount_in(balance0, reserve0, amount0_out);
            let amount1_in = amount_in(balance1, reserve1, amount1_out);
            if amount0_in.is_zero() && amount1_in.is_zero() {
                return Err(PairError::InsufficientInputAmount.into());
            }

            let balance0_adjusted = adjusted_balance(balance0, amount0_in)?;
            let balance1_adjusted = adjusted_balance(balance1, amount1_in)?;
            let product = balance0_adjusted
                .checked_mul(balance1_adjusted)
                .ok_or(PoolError::Overflow)?;
            // Reserves fit in 112 bits, so this cannot overflow.
            let required = reserve0 * reserve1 * fee_denominator() * fee_denominator();
            if product < required {
                return Err(PairError::K.into());
            }

            pm.update_reserves(pair, balance0, balance1)?;
            pm.emit(Event::Swap {
                pair,
                sender: caller,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
            });
            info!(
                %pair, %to, %amount0_in, %amount1_in, %amount0_out, %amount1_out,
                "swap executed"
            );
            Ok(())
        })
    }

    /// Send any balance above the recorded reserves to `to`.
    pub fn skim(&mut self, pair: Address, to: Address) -> Result<(), PoolError> {
        self.locked(pair, |pm| {
            let (token0, token1, reserves) = pm.pair_info(pair)?;
            let excess0 = pm
                .balance_of(token0, pair)?
                .checked_sub(reserves.reserve0)
                .ok_or(PoolError::Overflow)?;
            let excess1 = pm
                .balance_of(token1, pair)?
                .checked_sub(reserves.reserve1)
                .ok_or(PoolError::Overflow)?;
            pm.transfer(token0, pair, to, excess0)?;
            pm.transfer(token1, pair, to, excess1)?;
            debug!(%pair, %to, %excess0, %excess1, "excess balances skimmed");
            Ok(())
        })
    }

    /// Force the recorded reserves to match the actual balances.
    pub fn sync(&mut self, pair: Address) -> Result<(), PoolError> {
        self.locked(pair, |pm| {
            let (token0, token1, _) = pm.pair_info(pair)?;
            let balance0 = pm.balance_of(token0, pair)?;
            let balance1 = pm.balance_of(token1, pair)?;
            pm.update_reserves(pair, balance0, balance1)
        })
    }

    // ------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------

    /// Chained output amounts for an exact input along `path`.
    pub fn get_amounts_out(&self, amount_in: Amount, path: &[TokenId]) -> Result<Vec<Amount>, PoolError> {
        Ok(pricing::get_amounts_out(self, amount_in, path)?)
    }

    /// Chained input amounts for an exact output along `path`.
    pub fn get_amounts_in(&self, amount_out: Amount, path: &[TokenId]) -> Result<Vec<Amount>, PoolError> {
        Ok(pricing::get_amounts_in(self, amount_out, path)?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run `f` atomically with the pair's reentrancy lock held.
    fn locked<T>(
        &mut self,
        pair: Address,
        f: impl FnOnce(&mut Self) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        self.transact(|pm| {
            let p = pm.pair_mut(pair)?;
            if !p.is_unlocked() {
                return Err(PairError::Locked.into());
            }
            p.set_unlocked(false);
            let result = f(pm);
            if let Some(p) = pm.state.factory.pair_mut(&pair) {
                p.set_unlocked(true);
            }
            result
        })
    }

    fn pair_ref(&self, pair: Address) -> Result<&Pair, PoolError> {
        self.state
            .factory
            .pair(&pair)
            .ok_or(PoolError::PairNotFound(pair))
    }

    fn pair_mut(&mut self, pair: Address) -> Result<&mut Pair, PoolError> {
        self.state
            .factory
            .pair_mut(&pair)
            .ok_or(PoolError::PairNotFound(pair))
    }

    fn pair_info(&self, pair: Address) -> Result<(TokenId, TokenId, Reserves), PoolError> {
        let p = self.pair_ref(pair)?;
        Ok((p.token0(), p.token1(), p.get_reserves()))
    }

    fn update_reserves(
        &mut self,
        pair: Address,
        balance0: Amount,
        balance1: Amount,
    ) -> Result<(), PoolError> {
        let now = self.state.block_timestamp;
        self.pair_mut(pair)?.update(balance0, balance1, now)?;
        self.emit(Event::Sync {
            pair,
            reserve0: balance0,
            reserve1: balance1,
        });
        Ok(())
    }

    fn emit(&mut self, event: Event) {
        debug!(?event, "event emitted");
        self.state.events.push(event);
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("chain_id", &self.chain_id)
            .field("block_timestamp", &self.state.block_timestamp)
            .field("tokens", &self.state.tokens.len())
            .field("pairs", &self.state.factory.all_pairs_length())
            .field("callees", &self.callees.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReserveSource for PoolManager {
    fn factory_address(&self) -> Address {
        self.state.factory.address()
    }

    fn pair_code_hash(&self) -> B256 {
        self.state.factory.pair_code_hash()
    }

    fn pair_reserves(&self, pair: Address) -> Option<(U256, U256)> {
        self.state.factory.pair(&pair).map(|p| {
            let reserves = p.get_reserves();
            (reserves.reserve0, reserves.reserve1)
        })
    }
}

fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, PoolError> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(denominator))
        .ok_or(PoolError::Overflow)
}

/// Net input of one token detected after the optimistic transfer.
fn amount_in(balance: Amount, reserve: Amount, amount_out: Amount) -> Amount {
    let remaining = reserve - amount_out;
    if balance > remaining {
        balance - remaining
    } else {
        U256::ZERO
    }
}

fn fee_denominator() -> U256 {
    U256::from(FEE_DENOMINATOR)
}

/// `balance * 1000 - amount_in * 3`: the balance with the input fee removed.
fn adjusted_balance(balance: Amount, amount_in: Amount) -> Result<Amount, PoolError> {
    let scaled = balance
        .checked_mul(fee_denominator())
        .ok_or(PoolError::Overflow)?;
    let fee = amount_in * U256::from(FEE_DENOMINATOR - FEE_NUMERATOR);
    // amount_in <= balance, so this cannot underflow.
    Ok(scaled - fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uq112x112::Q112;

    fn token_a() -> TokenId {
        Address::repeat_byte(0x01)
    }

    fn token_b() -> TokenId {
        Address::repeat_byte(0x02)
    }

    fn lp() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn trader() -> Address {
        Address::repeat_byte(0xBB)
    }

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64.pow(18))
    }

    fn setup() -> (PoolManager, Address) {
        let mut pm = PoolManager::new();
        pm.deploy_token(token_a()).unwrap();
        pm.deploy_token(token_b()).unwrap();
        pm.mint_token(token_a(), lp(), e18(1_000)).unwrap();
        pm.mint_token(token_b(), lp(), e18(1_000)).unwrap();
        pm.mint_token(token_a(), trader(), e18(100)).unwrap();
        pm.mint_token(token_b(), trader(), e18(100)).unwrap();
        let pair = pm.create_pair(token_a(), token_b()).unwrap();
        (pm, pair)
    }

    fn add_liquidity(pm: &mut PoolManager, pair: Address, amount0: U256, amount1: U256) -> U256 {
        pm.transfer(token_a(), lp(), pair, amount0).unwrap();
        pm.transfer(token_b(), lp(), pair, amount1).unwrap();
        pm.mint(lp(), pair, lp()).unwrap()
    }

    fn assert_reserves_match_balances(pm: &PoolManager, pair: Address) {
        let reserves = pm.pair(pair).unwrap().get_reserves();
        assert_eq!(reserves.reserve0, pm.balance_of(token_a(), pair).unwrap());
        assert_eq!(reserves.reserve1, pm.balance_of(token_b(), pair).unwrap());
    }

    #[test]
    fn test_first_mint_locks_minimum_liquidity() {
        let (mut pm, pair) = setup();
        let liquidity = add_liquidity(&mut pm, pair, e18(1), e18(1));

        assert_eq!(liquidity, e18(1) - U256::from(MINIMUM_LIQUIDITY));
        assert_eq!(pm.share_balance_of(pair, lp()).unwrap(), liquidity);
        assert_eq!(
            pm.share_balance_of(pair, Address::ZERO).unwrap(),
            U256::from(MINIMUM_LIQUIDITY)
        );
        assert_eq!(pm.total_supply(pair).unwrap(), e18(1));
        assert_reserves_match_balances(&pm, pair);

        assert!(matches!(
            pm.transfer_shares(pair, Address::ZERO, lp(), U256::from(1)),
            Err(PoolError::Token(TokenError::InvalidSender))
        ));
    }

    #[test]
    fn test_first_mint_below_minimum_fails() {
        let (mut pm, pair) = setup();
        pm.transfer(token_a(), lp(), pair, U256::from(1_000)).unwrap();
        pm.transfer(token_b(), lp(), pair, U256::from(1_000)).unwrap();
        assert_eq!(
            pm.mint(lp(), pair, lp()),
            Err(PoolError::Pair(PairError::InsufficientLiquidityMinted))
        );
        assert_eq!(pm.total_supply(pair).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_unbalanced_deposit_takes_minimum_share() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(4));
        let supply = pm.total_supply(pair).unwrap();
        assert_eq!(supply, e18(2));

        // Twice the token0 ratio; shares follow the smaller proportion.
        let minted = add_liquidity(&mut pm, pair, e18(2), e18(4));
        assert_eq!(minted, e18(2));
        assert_reserves_match_balances(&pm, pair);
    }

    #[test]
    fn test_mint_without_deposit_fails() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));
        assert_eq!(
            pm.mint(lp(), pair, lp()),
            Err(PoolError::Pair(PairError::InsufficientLiquidityMinted))
        );
    }

    #[test]
    fn test_swap_exact_input() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));

        let amount_in = U256::from(300_000_000_000_000_000u64);
        let amount_out = pricing::get_amount_out(amount_in, e18(1), e18(1)).unwrap();
        assert_eq!(amount_out, U256::from(230_236_317_450_542_683u64));

        pm.transfer(token_a(), trader(), pair, amount_in).unwrap();
        pm.swap(trader(), pair, U256::ZERO, amount_out, trader(), &[])
            .unwrap();

        assert_eq!(pm.balance_of(token_a(), pair).unwrap(), e18(1) + amount_in);
        assert_eq!(pm.balance_of(token_b(), pair).unwrap(), e18(1) - amount_out);
        assert_eq!(
            pm.balance_of(token_b(), trader()).unwrap(),
            e18(100) + amount_out
        );
        assert_reserves_match_balances(&pm, pair);
    }

    #[test]
    fn test_swap_one_more_than_quote_violates_k() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(5), e18(10));

        let amount_in = e18(1);
        let amount_out = pricing::get_amount_out(amount_in, e18(5), e18(10)).unwrap();
        pm.transfer(token_a(), trader(), pair, amount_in).unwrap();

        assert_eq!(
            pm.swap(trader(), pair, U256::ZERO, amount_out + U256::from(1), trader(), &[]),
            Err(PoolError::Pair(PairError::K))
        );
        pm.swap(trader(), pair, U256::ZERO, amount_out, trader(), &[])
            .unwrap();
    }

    #[test]
    fn test_adjusted_balance_charges_input_fee() {
        let reserve = e18(10);
        let amount_in = e18(1);
        let adjusted = adjusted_balance(reserve + amount_in, amount_in).unwrap();
        // Only the input side is discounted, by the same factor pricing applies.
        assert_eq!(
            adjusted - reserve * U256::from(FEE_DENOMINATOR),
            amount_in * U256::from(FEE_NUMERATOR)
        );
        assert_eq!(
            adjusted_balance(U256::MAX, U256::ZERO),
            Err(PoolError::Overflow)
        );
    }

    #[test]
    fn test_swap_validation() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));

        assert_eq!(
            pm.swap(trader(), pair, U256::ZERO, U256::ZERO, trader(), &[]),
            Err(PoolError::Pair(PairError::InsufficientOutputAmount))
        );
        assert_eq!(
            pm.swap(trader(), pair, e18(1), U256::ZERO, trader(), &[]),
            Err(PoolError::Pair(PairError::InsufficientLiquidity))
        );
        assert_eq!(
            pm.swap(trader(), pair, U256::from(1), U256::ZERO, token_a(), &[]),
            Err(PoolError::Pair(PairError::InvalidTo))
        );
        assert_eq!(
            pm.swap(trader(), pair, U256::from(1), U256::ZERO, trader(), &[]),
            Err(PoolError::Pair(PairError::InsufficientInputAmount))
        );
        // Failed swaps leave nothing behind.
        assert_eq!(pm.balance_of(token_a(), trader()).unwrap(), e18(100));
        assert_reserves_match_balances(&pm, pair);
    }

    #[test]
    fn test_burn_returns_pro_rata_balances() {
        let (mut pm, pair) = setup();
        let liquidity = add_liquidity(&mut pm, pair, e18(3), e18(3));

        pm.transfer_shares(pair, lp(), pair, liquidity).unwrap();
        let (amount0, amount1) = pm.burn(lp(), pair, lp()).unwrap();

        let expected = e18(3) - U256::from(MINIMUM_LIQUIDITY);
        assert_eq!(amount0, expected);
        assert_eq!(amount1, expected);
        assert_eq!(pm.total_supply(pair).unwrap(), U256::from(MINIMUM_LIQUIDITY));
        assert_eq!(pm.balance_of(token_a(), lp()).unwrap(), e18(1_000) - U256::from(MINIMUM_LIQUIDITY));
        assert_reserves_match_balances(&pm, pair);
    }

    #[test]
    fn test_burn_without_shares_fails() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(3), e18(3));
        assert_eq!(
            pm.burn(lp(), pair, lp()),
            Err(PoolError::Pair(PairError::InsufficientLiquidityBurned))
        );
    }

    #[test]
    fn test_skim_and_sync() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));

        // A direct transfer bypasses the pool API.
        pm.transfer(token_a(), trader(), pair, e18(2)).unwrap();
        pm.skim(pair, trader()).unwrap();
        assert_eq!(pm.balance_of(token_a(), trader()).unwrap(), e18(100));
        assert_reserves_match_balances(&pm, pair);

        pm.transfer(token_b(), trader(), pair, e18(2)).unwrap();
        pm.sync(pair).unwrap();
        assert_eq!(pm.pair(pair).unwrap().get_reserves().reserve1, e18(3));
        assert_reserves_match_balances(&pm, pair);
    }

    #[test]
    fn test_sync_rejects_reserve_overflow() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));
        pm.mint_token(token_a(), pair, U256::from(1) << 112).unwrap();
        assert_eq!(pm.sync(pair), Err(PoolError::Pair(PairError::Overflow)));
        assert_eq!(pm.pair(pair).unwrap().get_reserves().reserve0, e18(1));
    }

    #[test]
    fn test_price_accumulators_grow_with_time() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(2));
        pm.advance_time(10);
        pm.sync(pair).unwrap();

        let p = pm.pair(pair).unwrap();
        assert_eq!(p.price0_cumulative_last(), Q112 * U256::from(2) * U256::from(10));
        assert_eq!(p.price1_cumulative_last(), Q112 / U256::from(2) * U256::from(10));
    }

    #[test]
    fn test_protocol_fee_minted_on_next_liquidity_event() {
        let setter = Address::repeat_byte(0x5E);
        let fee_to = Address::repeat_byte(0xFE);
        let mut pm = PoolManager::with_config(&DexConfig::default().with_fee_to_setter(setter));
        pm.deploy_token(token_a()).unwrap();
        pm.deploy_token(token_b()).unwrap();
        pm.mint_token(token_a(), lp(), e18(10)).unwrap();
        pm.mint_token(token_b(), lp(), e18(10)).unwrap();
        pm.mint_token(token_a(), trader(), e18(1)).unwrap();
        pm.set_fee_to(setter, fee_to).unwrap();
        let pair = pm.create_pair(token_a(), token_b()).unwrap();

        add_liquidity(&mut pm, pair, e18(1), e18(1));
        assert_eq!(pm.pair(pair).unwrap().k_last(), e18(1) * e18(1));

        let amount_in = U256::from(100_000_000_000_000_000u64);
        let amount_out = pricing::get_amount_out(amount_in, e18(1), e18(1)).unwrap();
        assert_eq!(amount_out, U256::from(90_661_089_388_014_913u64));
        pm.transfer(token_a(), trader(), pair, amount_in).unwrap();
        pm.swap(trader(), pair, U256::ZERO, amount_out, trader(), &[])
            .unwrap();
        assert_eq!(pm.share_balance_of(pair, fee_to).unwrap(), U256::ZERO);

        add_liquidity(&mut pm, pair, U256::from(1_000_000u64), U256::from(1_000_000u64));
        assert_eq!(
            pm.share_balance_of(pair, fee_to).unwrap(),
            U256::from(22_729_339_136_508u64)
        );
    }

    #[test]
    fn test_transact_rolls_back_on_error() {
        let (mut pm, _) = setup();
        let result: Result<(), PoolError> = pm.transact(|pm| {
            pm.transfer(token_a(), trader(), lp(), e18(1))?;
            pm.transfer(token_a(), trader(), lp(), e18(1_000))
        });
        assert!(result.is_err());
        assert_eq!(pm.balance_of(token_a(), trader()).unwrap(), e18(100));
    }

    #[test]
    fn test_unknown_pair_and_token() {
        let (mut pm, _) = setup();
        let nowhere = Address::repeat_byte(0x42);
        assert_eq!(pm.sync(nowhere), Err(PoolError::PairNotFound(nowhere)));
        assert_eq!(
            pm.balance_of(nowhere, lp()),
            Err(PoolError::UnknownToken(nowhere))
        );
        assert_eq!(pm.deploy_token(token_a()), Err(PoolError::TokenExists(token_a())));
    }

    #[test]
    fn test_events_journal() {
        let (mut pm, pair) = setup();
        add_liquidity(&mut pm, pair, e18(1), e18(1));
        let events = pm.drain_events();
        assert!(matches!(events[0], Event::PairCreated { index: 1, .. }));
        assert!(matches!(events[1], Event::Sync { .. }));
        assert!(matches!(events[2], Event::Mint { .. }));
        assert!(pm.events().is_empty());

        // Reverted calls leave no events behind.
        let _ = pm.swap(trader(), pair, U256::from(1), U256::ZERO, trader(), &[]);
        assert!(pm.events().is_empty());
    }
}
