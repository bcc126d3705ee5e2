//! Constant-product pricing formulas.
//!
//! Stateless helpers shared by the pools and the order executor. All swap
//! formulas take a 0.3% fee from the input (997/1000) and round in favour of
//! the pool.

use crate::types::{Address, Amount, TokenId, B256, FEE_DENOMINATOR, FEE_NUMERATOR, U256};
use alloy::primitives::keccak256;

/// Errors raised by the pricing formulas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("insufficient amount")]
    InsufficientAmount,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("invalid path")]
    InvalidPath,

    #[error("identical addresses")]
    IdenticalAddresses,

    #[error("zero address")]
    ZeroAddress,

    #[error("no pair deployed at {0}")]
    PairNotFound(Address),

    #[error("pricing arithmetic overflow")]
    Overflow,
}

/// Read access to live pool reserves, resolved by derived pair address.
pub trait ReserveSource {
    /// Address of the factory that deploys pairs.
    fn factory_address(&self) -> Address;

    /// Code fingerprint mixed into pair address derivation.
    fn pair_code_hash(&self) -> B256;

    /// Reserves `(reserve0, reserve1)` of the pair at `pair`, if one is deployed.
    fn pair_reserves(&self, pair: Address) -> Option<(U256, U256)>;
}

/// Order two tokens canonically (lower address first).
pub fn sort_tokens(token_a: TokenId, token_b: TokenId) -> Result<(TokenId, TokenId), PricingError> {
    if token_a == token_b {
        return Err(PricingError::IdenticalAddresses);
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0.is_zero() {
        return Err(PricingError::ZeroAddress);
    }
    Ok((token0, token1))
}

/// Salt for a pair's deterministic address: keccak256 of the packed sorted tokens.
pub fn pair_salt(token0: TokenId, token1: TokenId) -> B256 {
    let mut data = [0u8; 40];
    data[..20].copy_from_slice(token0.as_slice());
    data[20..].copy_from_slice(token1.as_slice());
    keccak256(data)
}

/// Derive the address of the pair for two tokens without any storage lookup.
///
/// The result is the same regardless of token order.
pub fn pair_for(
    factory: Address,
    pair_code_hash: B256,
    token_a: TokenId,
    token_b: TokenId,
) -> Result<Address, PricingError> {
    let (token0, token1) = sort_tokens(token_a, token_b)?;
    Ok(factory.create2(pair_salt(token0, token1), pair_code_hash))
}

/// Fetch the reserves of the pair for `token_a`/`token_b`, ordered to match the arguments.
pub fn get_reserves<S: ReserveSource + ?Sized>(
    source: &S,
    token_a: TokenId,
    token_b: TokenId,
) -> Result<(Amount, Amount), PricingError> {
    let (token0, _) = sort_tokens(token_a, token_b)?;
    let pair = pair_for(
        source.factory_address(),
        source.pair_code_hash(),
        token_a,
        token_b,
    )?;
    let (reserve0, reserve1) = source
        .pair_reserves(pair)
        .ok_or(PricingError::PairNotFound(pair))?;
    if token_a == token0 {
        Ok((reserve0, reserve1))
    } else {
        Ok((reserve1, reserve0))
    }
}

/// Given some amount of an asset and pair reserves, return the equivalent amount of the other asset.
pub fn quote(amount_a: Amount, reserve_a: Amount, reserve_b: Amount) -> Result<Amount, PricingError> {
    if amount_a.is_zero() {
        return Err(PricingError::InsufficientAmount);
    }
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok(amount_a
        .checked_mul(reserve_b)
        .ok_or(PricingError::Overflow)?
        / reserve_a)
}

/// Maximum output for an exact input, after the swap fee.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> Result<Amount, PricingError> {
    if amount_in.is_zero() {
        return Err(PricingError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(PricingError::InsufficientLiquidity);
    }
    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(FEE_NUMERATOR))
        .ok_or(PricingError::Overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(PricingError::Overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .and_then(|r| r.checked_add(amount_in_with_fee))
        .ok_or(PricingError::Overflow)?;
    Ok(numerator / denominator)
}

/// Minimum input required for an exact output, after the swap fee. Rounds up.
pub fn get_amount_in(
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
) -> Result<Amount, PricingError> {
    if amount_out.is_zero() {
        return Err(PricingError::InsufficientOutputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(PricingError::InsufficientLiquidity);
    }
    // The pool can never pay out its entire reserve.
    if amount_out >= reserve_out {
        return Err(PricingError::InsufficientLiquidity);
    }
    let numerator = reserve_in
        .checked_mul(amount_out)
        .and_then(|n| n.checked_mul(U256::from(FEE_DENOMINATOR)))
        .ok_or(PricingError::Overflow)?;
    let denominator = (reserve_out - amount_out)
        .checked_mul(U256::from(FEE_NUMERATOR))
        .ok_or(PricingError::Overflow)?;
    (numerator / denominator)
        .checked_add(U256::from(1))
        .ok_or(PricingError::Overflow)
}

/// Chained `get_amount_out` along `path`. `amounts[0]` is `amount_in`.
pub fn get_amounts_out<S: ReserveSource + ?Sized>(
    source: &S,
    amount_in: Amount,
    path: &[TokenId],
) -> Result<Vec<Amount>, PricingError> {
    if path.len() < 2 {
        return Err(PricingError::InvalidPath);
    }
    let mut amounts = Vec::with_capacity(path.len());
    amounts.push(amount_in);
    for (i, hop) in path.windows(2).enumerate() {
        let (reserve_in, reserve_out) = get_reserves(source, hop[0], hop[1])?;
        amounts.push(get_amount_out(amounts[i], reserve_in, reserve_out)?);
    }
    Ok(amounts)
}

/// Chained `get_amount_in` walking `path` backwards. The last entry is `amount_out`.
pub fn get_amounts_in<S: ReserveSource + ?Sized>(
    source: &S,
    amount_out: Amount,
    path: &[TokenId],
) -> Result<Vec<Amount>, PricingError> {
    if path.len() < 2 {
        return Err(PricingError::InvalidPath);
    }
    let mut amounts = vec![U256::ZERO; path.len()];
    amounts[path.len() - 1] = amount_out;
    for i in (1..path.len()).rev() {
        let (reserve_in, reserve_out) = get_reserves(source, path[i - 1], path[i])?;
        amounts[i - 1] = get_amount_in(amounts[i], reserve_in, reserve_out)?;
    }
    Ok(amounts)
}
