//! Fungible token ledger.
//!
//! Models the ERC-20 balance/allowance/transfer semantics the pools rely on.
//! Every token in the simulated chain is one `Erc20`, and each pool keeps one
//! for its liquidity shares.

use crate::types::{Address, Amount, U256};
use std::collections::HashMap;

/// Errors raised by token ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("token arithmetic overflow")]
    Overflow,

    #[error("transfers from the null address are not allowed")]
    InvalidSender,
}

/// Balances, allowances and total supply of a single token.
#[derive(Debug, Clone, Default)]
pub struct Erc20 {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl Erc20 {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, owner: Address) -> Amount {
        self.balances.get(&owner).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Create `amount` new tokens owned by `to`.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self.balances.entry(to).or_insert(U256::ZERO);
        // Cannot overflow: the balance is bounded by the total supply.
        *balance += amount;
        Ok(())
    }

    /// Destroy `amount` tokens owned by `from`.
    pub fn burn(&mut self, from: Address, amount: Amount) -> Result<(), TokenError> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        if from.is_zero() {
            return Err(TokenError::InvalidSender);
        }
        self.debit(from, amount)?;
        let balance = self.balances.entry(to).or_insert(U256::ZERO);
        *balance += amount;
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// An allowance of `U256::MAX` is treated as infinite and never decreases.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                have: allowance,
                need: amount,
            });
        }
        self.transfer(from, to, amount)?;
        if allowance != U256::MAX {
            self.allowances.insert((from, spender), allowance - amount);
        }
        Ok(())
    }

    fn debit(&mut self, from: Address, amount: Amount) -> Result<(), TokenError> {
        let have = self.balance_of(from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        self.balances.insert(from, have - amount);
        Ok(())
    }
}
