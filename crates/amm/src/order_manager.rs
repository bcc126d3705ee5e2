//! Batched execution of signed limit orders against the pools.
//!
//! Every order in a batch is validated, priced against the live reserves and
//! settled independently. A failing order yields a status in the result
//! array and never aborts the batch. Orders run sequentially, so each one
//! observes the reserves left behind by the orders before it.

use crate::config::DexConfig;
use crate::events::Event;
use crate::order::{ExecutionResult, ExecutionStatus, Order, SignedOrder};
use crate::pool_manager::PoolManager;
use crate::pricing::{self, ReserveSource};
use crate::signature::{canonical_signature, OrderSignatureValidator};
use crate::types::{Address, B256, U256};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Whole-call failures of the order manager. Nothing is changed when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderManagerError {
    #[error("caller {0} is not an executor")]
    NotExecutor(Address),

    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    #[error("empty batches are not supported")]
    EmptyOrdersNotSupported,

    #[error("batch of {len} orders exceeds chunk size {max}")]
    ChunkSizeExceeded { len: usize, max: usize },

    #[error("zero address not allowed")]
    NoZeroAddress,

    #[error("executor {0} already set")]
    ExecutorAlreadySet(Address),

    #[error("{0} is not an executor")]
    NoExecutorAddress(Address),
}

/// Executes batches of signed orders submitted by allow-listed executors.
#[derive(Debug, Clone)]
pub struct OrderManager {
    address: Address,
    owner: Address,
    chunk_size: usize,
    executors: HashSet<Address>,
    /// Canonical forms of the signatures consumed, successfully or not.
    issued: HashSet<[u8; 65]>,
    validator: OrderSignatureValidator,
}

impl OrderManager {
    /// Deploy an order manager at the configured address.
    pub fn new(config: &DexConfig, owner: Address) -> Self {
        Self {
            address: config.order_manager_address,
            owner,
            chunk_size: config.chunk_size,
            executors: HashSet::new(),
            issued: HashSet::new(),
            validator: OrderSignatureValidator::new(config.chain_id, config.order_manager_address),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_executor(&self, account: Address) -> bool {
        self.executors.contains(&account)
    }

    /// Whether `signature`, in any accepted encoding, has already been consumed by a batch.
    pub fn is_issued(&self, signature: &[u8]) -> bool {
        canonical_signature(signature)
            .map(|canonical| self.issued.contains(&canonical))
            .unwrap_or(false)
    }

    pub fn domain_separator(&self) -> B256 {
        self.validator.domain_separator()
    }

    /// The typed-data digest signers sign for `order`.
    pub fn order_hash(&self, order: &Order) -> B256 {
        self.validator.order_hash(order)
    }

    pub fn validator(&self) -> &OrderSignatureValidator {
        &self.validator
    }

    /// Allow `executor` to submit batches.
    pub fn add_executor(&mut self, caller: Address, executor: Address) -> Result<(), OrderManagerError> {
        self.only_owner(caller)?;
        if executor == Address::ZERO {
            return Err(OrderManagerError::NoZeroAddress);
        }
        if !self.executors.insert(executor) {
            return Err(OrderManagerError::ExecutorAlreadySet(executor));
        }
        info!(%executor, "executor added");
        Ok(())
    }

    /// Revoke `executor`.
    pub fn remove_executor(&mut self, caller: Address, executor: Address) -> Result<(), OrderManagerError> {
        self.only_owner(caller)?;
        if executor == Address::ZERO {
            return Err(OrderManagerError::NoZeroAddress);
        }
        if !self.executors.remove(&executor) {
            return Err(OrderManagerError::NoExecutorAddress(executor));
        }
        info!(%executor, "executor removed");
        Ok(())
    }

    /// Execute a batch of signed orders.
    ///
    /// Returns one result per order, in input order. Only an unauthorized
    /// caller, an empty batch or a batch above the chunk size fails the call.
    pub fn batch_execute_order(
        &mut self,
        pool_manager: &mut PoolManager,
        caller: Address,
        orders: &[SignedOrder],
    ) -> Result<Vec<ExecutionResult>, OrderManagerError> {
        let results = self.execute_batch(pool_manager, caller, orders, |_, _| ())?;
        Ok(results.into_iter().map(|(result, ())| result).collect())
    }

    /// Like [`batch_execute_order`](Self::batch_execute_order), pairing each
    /// result with the pool events its settlement emitted.
    ///
    /// The events are also left in the pool manager's journal.
    pub fn batch_execute_order_with_events(
        &mut self,
        pool_manager: &mut PoolManager,
        caller: Address,
        orders: &[SignedOrder],
    ) -> Result<Vec<(ExecutionResult, Vec<Event>)>, OrderManagerError> {
        self.execute_batch(pool_manager, caller, orders, |pm, first_event| {
            pm.events()
                .get(first_event..)
                .map(<[Event]>::to_vec)
                .unwrap_or_default()
        })
    }

    fn execute_batch<T>(
        &mut self,
        pool_manager: &mut PoolManager,
        caller: Address,
        orders: &[SignedOrder],
        mut observe: impl FnMut(&PoolManager, usize) -> T,
    ) -> Result<Vec<(ExecutionResult, T)>, OrderManagerError> {
        if !self.is_executor(caller) {
            return Err(OrderManagerError::NotExecutor(caller));
        }
        if orders.is_empty() {
            return Err(OrderManagerError::EmptyOrdersNotSupported);
        }
        if orders.len() > self.chunk_size {
            return Err(OrderManagerError::ChunkSizeExceeded {
                len: orders.len(),
                max: self.chunk_size,
            });
        }

        let mut results = Vec::with_capacity(orders.len());
        for signed in orders {
            let first_event = pool_manager.events().len();
            let status = self.execute_order(pool_manager, signed);
            debug!(from = %signed.order.from, %status, "order processed");
            results.push((ExecutionResult::from(status), observe(pool_manager, first_event)));
        }

        let filled = results.iter().filter(|(r, _)| r.success).count();
        info!(%caller, orders = orders.len(), filled, "batch executed");
        Ok(results)
    }

    fn execute_order(&mut self, pool_manager: &mut PoolManager, signed: &SignedOrder) -> ExecutionStatus {
        let order = &signed.order;

        if self.is_issued(&signed.signature) {
            return ExecutionStatus::AlreadyIssued;
        }
        if !is_well_formed(order) {
            return ExecutionStatus::InvalidStructure;
        }
        if !self.validator.is_valid(order, &signed.signature) {
            return ExecutionStatus::InvalidSignature;
        }
        let Ok(canonical) = canonical_signature(&signed.signature) else {
            return ExecutionStatus::InvalidSignature;
        };

        // Consumed from here on, whatever the outcome.
        self.issued.insert(canonical);

        let (token_in, token_out) = (order.path[0], order.path[1]);
        let Ok(pair) = pricing::pair_for(
            pool_manager.factory_address(),
            pool_manager.pair_code_hash(),
            token_in,
            token_out,
        ) else {
            return ExecutionStatus::WrongTokenAddress;
        };
        if pair == Address::ZERO {
            return ExecutionStatus::WrongTokenAddress;
        }

        if U256::from(pool_manager.block_timestamp()) > order.deadline {
            return ExecutionStatus::Expired;
        }

        let amount_out = match pricing::get_reserves(&*pool_manager, token_in, token_out)
            .and_then(|(reserve_in, reserve_out)| {
                pricing::get_amount_out(order.amountIn, reserve_in, reserve_out)
            }) {
            Ok(amount) if !amount.is_zero() => amount,
            _ => return ExecutionStatus::InsufficientLiquidity,
        };

        if amount_out < order.amountOutMin {
            return ExecutionStatus::SlippageTooHigh;
        }

        let (amount0_out, amount1_out) = if token_in < token_out {
            (U256::ZERO, amount_out)
        } else {
            (amount_out, U256::ZERO)
        };
        let spender = self.address;
        let settled = pool_manager.transact(|pm| {
            if !pm.try_transfer_from(token_in, spender, order.from, pair, order.amountIn) {
                return Err(ExecutionStatus::TransferFailed);
            }
            pm.swap(spender, pair, amount0_out, amount1_out, order.to, &[])
                .map_err(|err| {
                    warn!(%pair, %err, "order settlement reverted");
                    ExecutionStatus::ExecutionFailed
                })
        });

        match settled {
            Ok(()) => ExecutionStatus::Filled,
            Err(status) => status,
        }
    }

    fn only_owner(&self, caller: Address) -> Result<(), OrderManagerError> {
        if caller != self.owner {
            return Err(OrderManagerError::NotOwner(caller));
        }
        Ok(())
    }
}

/// A single-hop path of two distinct tokens, non-zero parties and a non-zero input.
fn is_well_formed(order: &Order) -> bool {
    order.path.len() == 2
        && order.from != Address::ZERO
        && order.to != Address::ZERO
        && order.path[0] != order.path[1]
        && !order.amountIn.is_zero()
}
