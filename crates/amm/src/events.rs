//! Events emitted by the registry and the pools.

use crate::types::{Address, Amount, TokenId};

/// An event appended to the [`PoolManager`](crate::PoolManager) journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PairCreated {
        token0: TokenId,
        token1: TokenId,
        pair: Address,
        /// Ordinal of the pair in the registry (1-based).
        index: u64,
    },
    Mint {
        pair: Address,
        sender: Address,
        amount0: Amount,
        amount1: Amount,
    },
    Burn {
        pair: Address,
        sender: Address,
        amount0: Amount,
        amount1: Amount,
        to: Address,
    },
    Swap {
        pair: Address,
        sender: Address,
        amount0_in: Amount,
        amount1_in: Amount,
        amount0_out: Amount,
        amount1_out: Amount,
        to: Address,
    },
    Sync {
        pair: Address,
        reserve0: Amount,
        reserve1: Amount,
    },
}

impl Event {
    /// The contract that emitted the event.
    pub fn emitter(&self, factory: Address) -> Address {
        match self {
            Event::PairCreated { .. } => factory,
            Event::Mint { pair, .. }
            | Event::Burn { pair, .. }
            | Event::Swap { pair, .. }
            | Event::Sync { pair, .. } => *pair,
        }
    }
}
