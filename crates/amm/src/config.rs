//! Exchange configuration parameters.

use crate::types::Address;
use alloy::primitives::address;

/// Default address of the pair factory.
pub const DEFAULT_FACTORY_ADDRESS: Address = address!("4200000000000000000000000000000000000100");

/// Default address of the signed-order executor.
pub const DEFAULT_ORDER_MANAGER_ADDRESS: Address =
    address!("4200000000000000000000000000000000000101");

/// Configuration for the exchange.
#[derive(Debug, Clone)]
pub struct DexConfig {
    /// Chain identifier bound into every order signature.
    pub chain_id: u64,

    /// Maximum number of orders accepted by one batch execution call.
    pub chunk_size: usize,

    /// Address the pair factory is deployed at.
    pub factory_address: Address,

    /// Address the order executor is deployed at.
    pub order_manager_address: Address,

    /// Identity allowed to change the protocol fee recipient.
    /// The zero address leaves the protocol fee permanently off.
    pub fee_to_setter: Address,

    /// Unix timestamp of the first block.
    pub genesis_timestamp: u64,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            chunk_size: 50,
            factory_address: DEFAULT_FACTORY_ADDRESS,
            order_manager_address: DEFAULT_ORDER_MANAGER_ADDRESS,
            fee_to_setter: Address::ZERO,
            genesis_timestamp: 1_700_000_000,
        }
    }
}

impl DexConfig {
    /// Create a new configuration with a custom chain id.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Create a new configuration with a custom batch chunk limit.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Create a new configuration with a custom fee setter.
    pub fn with_fee_to_setter(mut self, fee_to_setter: Address) -> Self {
        self.fee_to_setter = fee_to_setter;
        self
    }

    /// Create a new configuration with custom contract addresses.
    pub fn with_addresses(mut self, factory: Address, order_manager: Address) -> Self {
        self.factory_address = factory;
        self.order_manager_address = order_manager;
        self
    }

    /// Create a new configuration starting the clock at `timestamp`.
    pub fn with_genesis_timestamp(mut self, timestamp: u64) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }
}
