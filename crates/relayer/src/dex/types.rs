//! Type definitions for relayed order manager calls.

use crate::selectors::ExecutionResult;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;

/// Outcome of one order of a relayed batch.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
    /// Typed-data hash of the order.
    pub order_hash: B256,
    /// The order's signer.
    pub from: Address,
    pub result: amm::ExecutionResult,
    /// Pool events emitted while this order settled.
    pub events: Vec<amm::Event>,
}

/// Result of a relayed call.
#[derive(Debug, Clone)]
pub enum DexResult {
    BatchExecuted {
        orders: Vec<OrderOutcome>,
    },
    ExecutorAdded {
        executor: Address,
    },
    ExecutorRemoved {
        executor: Address,
    },
    AmountsOut {
        amounts: Vec<U256>,
    },
}

impl DexResult {
    /// ABI-encoded return value of the call.
    pub fn return_data(&self) -> Bytes {
        match self {
            DexResult::BatchExecuted { orders, .. } => orders
                .iter()
                .map(|outcome| ExecutionResult::from(outcome.result))
                .collect::<Vec<_>>()
                .abi_encode()
                .into(),
            DexResult::AmountsOut { amounts } => amounts.abi_encode().into(),
            DexResult::ExecutorAdded { .. } | DexResult::ExecutorRemoved { .. } => Bytes::new(),
        }
    }
}

/// Errors that can occur while relaying a call.
#[derive(Debug, thiserror::Error)]
pub enum DexError {
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),

    #[error(transparent)]
    OrderManager(#[from] amm::OrderManagerError),

    #[error(transparent)]
    Pool(#[from] amm::PoolError),
}
