//! Order manager transaction handler.

use super::types::{DexError, DexResult, OrderOutcome};
use crate::config::RelayerConfig;
use crate::selectors::{selectors, IFactory, IOrderManager, IPair};
use alloy_primitives::{Address, Bytes, Log, LogData, B256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use amm::{Event, OrderManager, PoolManager};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// The pools and the order manager they settle for.
#[derive(Debug)]
pub struct Engine {
    pub pools: PoolManager,
    pub orders: OrderManager,
}

/// Handler for calls to the order manager.
#[derive(Debug)]
pub struct DexHandler {
    engine: RwLock<Engine>,
}

impl DexHandler {
    /// Create a handler over a fresh engine: fee recipient set and executors allow-listed.
    pub fn new(config: &RelayerConfig) -> Result<Self, DexError> {
        let dex_config = config.dex_config();
        let mut pools = PoolManager::with_config(&dex_config);
        let mut orders = OrderManager::new(&dex_config, config.owner);

        if !config.fee_to.is_zero() {
            pools.set_fee_to(config.owner, config.fee_to)?;
        }
        for executor in &config.executors {
            orders.add_executor(config.owner, *executor)?;
        }

        Ok(Self {
            engine: RwLock::new(Engine { pools, orders }),
        })
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Engine> {
        self.engine.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Engine> {
        self.engine.write()
    }

    /// Address of the order manager contract.
    pub fn address(&self) -> Address {
        self.engine.read().orders.address()
    }

    /// Handle a transaction to the order manager.
    ///
    /// # Arguments
    /// * `caller` - The address calling the order manager
    /// * `calldata` - The transaction calldata
    ///
    /// # Returns
    /// * `Ok(DexResult)` - The result of the call
    /// * `Err(DexError)` - If the whole call reverted
    pub fn handle_transaction(&self, caller: Address, calldata: &Bytes) -> Result<DexResult, DexError> {
        if calldata.len() < 4 {
            return Err(DexError::InvalidCalldata(
                "calldata too short for function selector".to_string(),
            ));
        }

        let selector = &calldata[0..4];
        let data = &calldata[4..];

        match selector {
            s if s == selectors::BATCH_EXECUTE_ORDER.as_slice() => {
                self.handle_batch_execute_order(caller, data)
            }
            s if s == selectors::ADD_EXECUTOR.as_slice() => self.handle_add_executor(caller, data),
            s if s == selectors::REMOVE_EXECUTOR.as_slice() => {
                self.handle_remove_executor(caller, data)
            }
            s if s == selectors::GET_AMOUNTS_OUT.as_slice() => self.handle_get_amounts_out(data),
            _ => Err(DexError::InvalidCalldata(format!(
                "unknown function selector: 0x{}",
                hex::encode(selector)
            ))),
        }
    }

    /// Handle batchExecuteOrder(((uint256,uint256,address[],address,address,uint256,uint256),bytes)[])
    fn handle_batch_execute_order(&self, caller: Address, data: &[u8]) -> Result<DexResult, DexError> {
        let call = IOrderManager::batchExecuteOrderCall::abi_decode_raw(data).map_err(|e| {
            DexError::InvalidCalldata(format!("failed to decode batchExecuteOrder: {}", e))
        })?;
        let signed: Vec<amm::SignedOrder> = call.orders.into_iter().map(Into::into).collect();
        debug!(%caller, orders = signed.len(), "batchExecuteOrder");

        let mut engine = self.engine.write();
        let Engine { pools, orders } = &mut *engine;
        let results = orders.batch_execute_order_with_events(pools, caller, &signed)?;
        // Each outcome carries its own events.
        pools.drain_events();

        let outcomes = signed
            .iter()
            .zip(results)
            .map(|(s, (result, events))| OrderOutcome {
                order_hash: orders.order_hash(&s.order),
                from: s.order.from,
                result,
                events,
            })
            .collect();

        Ok(DexResult::BatchExecuted { orders: outcomes })
    }

    /// Handle addExecutor(address)
    fn handle_add_executor(&self, caller: Address, data: &[u8]) -> Result<DexResult, DexError> {
        let call = IOrderManager::addExecutorCall::abi_decode_raw(data).map_err(|e| {
            DexError::InvalidCalldata(format!("failed to decode addExecutor: {}", e))
        })?;
        self.engine.write().orders.add_executor(caller, call.executor)?;
        Ok(DexResult::ExecutorAdded {
            executor: call.executor,
        })
    }

    /// Handle removeExecutor(address)
    fn handle_remove_executor(&self, caller: Address, data: &[u8]) -> Result<DexResult, DexError> {
        let call = IOrderManager::removeExecutorCall::abi_decode_raw(data).map_err(|e| {
            DexError::InvalidCalldata(format!("failed to decode removeExecutor: {}", e))
        })?;
        self.engine.write().orders.remove_executor(caller, call.executor)?;
        Ok(DexResult::ExecutorRemoved {
            executor: call.executor,
        })
    }

    /// Handle getAmountsOut(uint256,address[])
    fn handle_get_amounts_out(&self, data: &[u8]) -> Result<DexResult, DexError> {
        let call = IOrderManager::getAmountsOutCall::abi_decode_raw(data).map_err(|e| {
            DexError::InvalidCalldata(format!("failed to decode getAmountsOut: {}", e))
        })?;
        let amounts = self
            .engine
            .read()
            .pools
            .get_amounts_out(call.amountIn, &call.path)?;
        Ok(DexResult::AmountsOut { amounts })
    }

    /// Create logs for a call result.
    ///
    /// Batch logs follow execution order: each order's pool logs, then its
    /// `OrderExecuted`.
    pub fn create_logs(&self, result: &DexResult) -> Vec<Log> {
        let engine = self.engine.read();
        let manager = engine.orders.address();
        let factory = engine.pools.factory().address();
        let mut logs = Vec::new();

        match result {
            DexResult::BatchExecuted { orders } => {
                for outcome in orders {
                    logs.extend(outcome.events.iter().map(|event| pool_log(event, factory)));
                    logs.push(Log {
                        address: manager,
                        data: IOrderManager::OrderExecuted {
                            orderHash: outcome.order_hash,
                            from: outcome.from,
                            success: outcome.result.success,
                            status: outcome.result.status.code(),
                        }
                        .encode_log_data(),
                    });
                }
                let filled = orders.iter().filter(|o| o.result.success).count();
                info!(orders = orders.len(), filled, logs = logs.len(), "batch relayed");
            }
            DexResult::ExecutorAdded { executor } => {
                logs.push(Log {
                    address: manager,
                    data: IOrderManager::ExecutorAdded {
                        executor: *executor,
                    }
                    .encode_log_data(),
                });
            }
            DexResult::ExecutorRemoved { executor } => {
                logs.push(Log {
                    address: manager,
                    data: IOrderManager::ExecutorRemoved {
                        executor: *executor,
                    }
                    .encode_log_data(),
                });
            }
            DexResult::AmountsOut { .. } => {}
        }

        logs
    }
}

/// Render a pool journal entry as the log its contract would emit.
fn pool_log(event: &Event, factory: Address) -> Log {
    let address = event.emitter(factory);
    let (topics, data) = match event {
        Event::PairCreated {
            token0,
            token1,
            pair,
            index,
        } => (
            vec![
                IFactory::PairCreated::SIGNATURE_HASH,
                B256::left_padding_from(token0.as_slice()),
                B256::left_padding_from(token1.as_slice()),
            ],
            (*pair, amm::U256::from(*index)).abi_encode(),
        ),
        Event::Mint {
            sender,
            amount0,
            amount1,
            ..
        } => (
            vec![
                IPair::Mint::SIGNATURE_HASH,
                B256::left_padding_from(sender.as_slice()),
            ],
            (*amount0, *amount1).abi_encode(),
        ),
        Event::Burn {
            sender,
            amount0,
            amount1,
            to,
            ..
        } => (
            vec![
                IPair::Burn::SIGNATURE_HASH,
                B256::left_padding_from(sender.as_slice()),
                B256::left_padding_from(to.as_slice()),
            ],
            (*amount0, *amount1).abi_encode(),
        ),
        Event::Swap {
            sender,
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            to,
            ..
        } => (
            vec![
                IPair::Swap::SIGNATURE_HASH,
                B256::left_padding_from(sender.as_slice()),
                B256::left_padding_from(to.as_slice()),
            ],
            (*amount0_in, *amount1_in, *amount0_out, *amount1_out).abi_encode(),
        ),
        Event::Sync {
            reserve0, reserve1, ..
        } => (
            vec![IPair::Sync::SIGNATURE_HASH],
            (*reserve0, *reserve1).abi_encode(),
        ),
    };
    Log {
        address,
        data: LogData::new_unchecked(topics, data.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::{Order, SignedOrder};
    use alloy_primitives::U256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use amm::ExecutionStatus;

    fn weth() -> Address {
        Address::repeat_byte(0x01)
    }

    fn usdc() -> Address {
        Address::repeat_byte(0x02)
    }

    fn lp() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64.pow(18))
    }

    fn handler() -> (DexHandler, RelayerConfig) {
        let config = RelayerConfig::default();
        let handler = DexHandler::new(&config).unwrap();
        {
            let mut engine = handler.write();
            let manager = engine.orders.address();
            let pools = &mut engine.pools;
            for token in [weth(), usdc()] {
                pools.deploy_token(token).unwrap();
                pools.mint_token(token, lp(), e18(100)).unwrap();
            }
            let pair = pools.create_pair(weth(), usdc()).unwrap();
            pools.transfer(weth(), lp(), pair, e18(10)).unwrap();
            pools.transfer(usdc(), lp(), pair, e18(10)).unwrap();
            pools.mint(lp(), pair, lp()).unwrap();
            pools.mint_token(weth(), trader().address(), e18(5)).unwrap();
            pools
                .approve(weth(), trader().address(), manager, U256::MAX)
                .unwrap();
            pools.drain_events();
        }
        (handler, config)
    }

    fn trader() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::repeat_byte(0x11)).unwrap()
    }

    fn signed_order(handler: &DexHandler, amount_out_min: U256) -> SignedOrder {
        let trader = trader();
        let order = Order {
            amountIn: e18(1),
            amountOutMin: amount_out_min,
            path: vec![weth(), usdc()],
            from: trader.address(),
            to: trader.address(),
            deadline: U256::from(2_000_000_000u64),
            timestamp: U256::from(1_700_000_000u64),
        };
        let hash = handler.read().orders.order_hash(&order.clone().into());
        let sig = trader.sign_hash_sync(&hash).unwrap();
        let mut signature = Vec::with_capacity(65);
        signature.extend_from_slice(&sig.r().to_be_bytes::<32>());
        signature.extend_from_slice(&sig.s().to_be_bytes::<32>());
        signature.push(27 + sig.v() as u8);
        SignedOrder {
            order,
            signature: signature.into(),
        }
    }

    #[test]
    fn test_batch_execute_order() {
        let (handler, config) = handler();
        let signed = signed_order(&handler, U256::ZERO);
        let calldata: Bytes = IOrderManager::batchExecuteOrderCall {
            orders: vec![signed.clone(), signed],
        }
        .abi_encode()
        .into();

        let result = handler
            .handle_transaction(config.executors[0], &calldata)
            .unwrap();
        let DexResult::BatchExecuted { orders } = &result else {
            panic!("unexpected result {result:?}");
        };
        assert_eq!(orders[0].result.status, ExecutionStatus::Filled);
        assert_eq!(orders[1].result.status, ExecutionStatus::AlreadyIssued);
        assert_eq!(orders[0].from, trader().address());
        // One settled swap: Sync then Swap.
        assert_eq!(orders[0].events.len(), 2);
        assert!(orders[1].events.is_empty());
        assert!(handler.read().pools.events().is_empty());

        let logs = handler.create_logs(&result);
        assert_eq!(logs.len(), 4);
        let executed = &logs[2];
        assert_eq!(executed.address, handler.address());
        assert_eq!(executed.data.topics()[0], IOrderManager::OrderExecuted::SIGNATURE_HASH);
        assert_eq!(executed.data.topics()[1], orders[0].order_hash);
        let decoded = IOrderManager::OrderExecuted::decode_log_data(&executed.data).unwrap();
        assert!(decoded.success);
        assert_eq!(decoded.status, ExecutionStatus::Filled.code());

        let returned =
            Vec::<crate::selectors::ExecutionResult>::abi_decode(&result.return_data()).unwrap();
        assert_eq!(returned.len(), 2);
        assert!(returned[0].success);
        assert_eq!(returned[1].status, ExecutionStatus::AlreadyIssued.code());
    }

    #[test]
    fn test_logs_follow_execution_order() {
        let (handler, config) = handler();
        let first = signed_order(&handler, U256::ZERO);
        let mut second = signed_order(&handler, U256::ZERO);
        second.order.timestamp += U256::from(1);
        let hash = handler.read().orders.order_hash(&second.order.clone().into());
        let sig = trader().sign_hash_sync(&hash).unwrap();
        second.signature = sig.as_bytes().to_vec().into();

        let calldata: Bytes = IOrderManager::batchExecuteOrderCall {
            orders: vec![first, second],
        }
        .abi_encode()
        .into();
        let result = handler
            .handle_transaction(config.executors[0], &calldata)
            .unwrap();
        let DexResult::BatchExecuted { orders } = &result else {
            panic!("unexpected result {result:?}");
        };
        assert!(orders.iter().all(|o| o.result.success));

        let topics: Vec<B256> = handler
            .create_logs(&result)
            .iter()
            .map(|log| log.data.topics()[0])
            .collect();
        let per_order = [
            IPair::Sync::SIGNATURE_HASH,
            IPair::Swap::SIGNATURE_HASH,
            IOrderManager::OrderExecuted::SIGNATURE_HASH,
        ];
        assert_eq!(topics, [per_order, per_order].concat());
    }

    #[test]
    fn test_unauthorized_batch_reverts() {
        let (handler, _) = handler();
        let calldata: Bytes = IOrderManager::batchExecuteOrderCall {
            orders: vec![signed_order(&handler, U256::ZERO)],
        }
        .abi_encode()
        .into();
        let result = handler.handle_transaction(lp(), &calldata);
        assert!(matches!(
            result,
            Err(DexError::OrderManager(amm::OrderManagerError::NotExecutor(_)))
        ));
    }

    #[test]
    fn test_executor_management() {
        let (handler, config) = handler();
        let relayer = Address::repeat_byte(0x77);
        let add: Bytes = IOrderManager::addExecutorCall { executor: relayer }
            .abi_encode()
            .into();

        assert!(handler.handle_transaction(lp(), &add).is_err());
        let result = handler.handle_transaction(config.owner, &add).unwrap();
        assert!(handler.read().orders.is_executor(relayer));
        let logs = handler.create_logs(&result);
        assert_eq!(logs[0].data.topics()[0], IOrderManager::ExecutorAdded::SIGNATURE_HASH);

        let remove: Bytes = IOrderManager::removeExecutorCall { executor: relayer }
            .abi_encode()
            .into();
        handler.handle_transaction(config.owner, &remove).unwrap();
        assert!(!handler.read().orders.is_executor(relayer));
    }

    #[test]
    fn test_get_amounts_out() {
        let (handler, _) = handler();
        let calldata: Bytes = IOrderManager::getAmountsOutCall {
            amountIn: e18(1),
            path: vec![weth(), usdc()],
        }
        .abi_encode()
        .into();
        let result = handler.handle_transaction(lp(), &calldata).unwrap();
        let amounts = Vec::<U256>::abi_decode(&result.return_data()).unwrap();
        assert_eq!(
            amounts,
            vec![e18(1), amm::pricing::get_amount_out(e18(1), e18(10), e18(10)).unwrap()]
        );
        assert!(handler.create_logs(&result).is_empty());
    }

    #[test]
    fn test_invalid_calldata() {
        let (handler, _) = handler();
        assert!(matches!(
            handler.handle_transaction(lp(), &Bytes::from_static(&[0x12, 0x34])),
            Err(DexError::InvalidCalldata(_))
        ));
        assert!(matches!(
            handler.handle_transaction(lp(), &Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])),
            Err(DexError::InvalidCalldata(_))
        ));
        let truncated = Bytes::copy_from_slice(&selectors::ADD_EXECUTOR);
        assert!(matches!(
            handler.handle_transaction(lp(), &truncated),
            Err(DexError::InvalidCalldata(_))
        ));
    }
}
