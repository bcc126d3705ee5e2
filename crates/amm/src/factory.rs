//! Pair registry and deterministic pair deployment.

use crate::pair::{Pair, PairError};
use crate::pricing::{self, PricingError};
use crate::types::{Address, TokenId, B256};
use alloy::primitives::keccak256;
use std::collections::HashMap;
use tracing::info;

/// Identifier of the pair implementation, hashed into every pair address.
pub const PAIR_CODE_ID: &[u8] = b"amm::pair::Pair/v1";

/// Code fingerprint used for pair address derivation.
pub fn pair_code_hash() -> B256 {
    keccak256(PAIR_CODE_ID)
}

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("identical addresses")]
    IdenticalAddresses,

    #[error("zero address")]
    ZeroAddress,

    #[error("pair exists")]
    PairExists,

    #[error("forbidden")]
    Forbidden,

    #[error("pair initialization failed: {0}")]
    Initialize(#[from] PairError),

    #[error("pair address derivation failed: {0}")]
    Pricing(PricingError),
}

impl From<PricingError> for FactoryError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::IdenticalAddresses => FactoryError::IdenticalAddresses,
            PricingError::ZeroAddress => FactoryError::ZeroAddress,
            other => FactoryError::Pricing(other),
        }
    }
}

/// Details of a newly created pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCreated {
    pub token0: TokenId,
    pub token1: TokenId,
    pub pair: Address,
    /// Number of pairs after this one was registered.
    pub index: u64,
}

/// The pair registry. Owns every deployed pair.
#[derive(Debug, Clone)]
pub struct Factory {
    address: Address,
    pair_code_hash: B256,
    fee_to: Address,
    fee_to_setter: Address,
    /// Populated in both token orders.
    get_pair: HashMap<(TokenId, TokenId), Address>,
    all_pairs: Vec<Address>,
    pairs: HashMap<Address, Pair>,
}

impl Factory {
    /// Create an empty registry deployed at `address`.
    pub fn new(address: Address, fee_to_setter: Address) -> Self {
        Self {
            address,
            pair_code_hash: pair_code_hash(),
            fee_to: Address::ZERO,
            fee_to_setter,
            get_pair: HashMap::new(),
            all_pairs: Vec::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn pair_code_hash(&self) -> B256 {
        self.pair_code_hash
    }

    /// Recipient of the protocol fee, or the zero address when the fee is off.
    pub fn fee_to(&self) -> Address {
        self.fee_to
    }

    pub fn fee_to_setter(&self) -> Address {
        self.fee_to_setter
    }

    /// Look up the registered pair for two tokens, in either order.
    pub fn get_pair(&self, token_a: TokenId, token_b: TokenId) -> Option<Address> {
        self.get_pair.get(&(token_a, token_b)).copied()
    }

    pub fn all_pairs(&self) -> &[Address] {
        &self.all_pairs
    }

    pub fn all_pairs_length(&self) -> usize {
        self.all_pairs.len()
    }

    /// Derive the address a pair for these tokens has (or would have).
    pub fn pair_for(&self, token_a: TokenId, token_b: TokenId) -> Result<Address, PricingError> {
        pricing::pair_for(self.address, self.pair_code_hash, token_a, token_b)
    }

    pub fn pair(&self, address: &Address) -> Option<&Pair> {
        self.pairs.get(address)
    }

    pub(crate) fn pair_mut(&mut self, address: &Address) -> Option<&mut Pair> {
        self.pairs.get_mut(address)
    }

    /// Deploy and register the pool for two tokens.
    pub fn create_pair(
        &mut self,
        token_a: TokenId,
        token_b: TokenId,
    ) -> Result<PairCreated, FactoryError> {
        let (token0, token1) = pricing::sort_tokens(token_a, token_b)?;
        if self.get_pair.contains_key(&(token0, token1)) {
            return Err(FactoryError::PairExists);
        }

        let address = self.pair_for(token0, token1)?;
        let mut pair = Pair::new(address, self.address);
        pair.initialize(self.address, token0, token1)?;

        self.pairs.insert(address, pair);
        self.get_pair.insert((token0, token1), address);
        self.get_pair.insert((token1, token0), address);
        self.all_pairs.push(address);

        let index = self.all_pairs.len() as u64;
        info!(%token0, %token1, pair = %address, index, "pair created");

        Ok(PairCreated {
            token0,
            token1,
            pair: address,
            index,
        })
    }

    pub fn set_fee_to(&mut self, caller: Address, fee_to: Address) -> Result<(), FactoryError> {
        if caller != self.fee_to_setter {
            return Err(FactoryError::Forbidden);
        }
        info!(%fee_to, "protocol fee recipient updated");
        self.fee_to = fee_to;
        Ok(())
    }

    pub fn set_fee_to_setter(
        &mut self,
        caller: Address,
        fee_to_setter: Address,
    ) -> Result<(), FactoryError> {
        if caller != self.fee_to_setter {
            return Err(FactoryError::Forbidden);
        }
        info!(%fee_to_setter, "fee setter updated");
        self.fee_to_setter = fee_to_setter;
        Ok(())
    }
}
