//! Off-chain relayer for the signed-order executor.
//!
//! Boots an in-memory devnet from environment configuration, signs a demo
//! batch of orders and relays it through the order manager's ABI, printing
//! the resulting statuses and logs.
//!
//! Run with: `RUST_LOG=debug cargo run -p amm-relayer`

mod config;
mod devnet;
mod dex;
mod selectors;

use crate::config::RelayerConfig;
use crate::dex::{DexHandler, DexResult};
use crate::selectors::IOrderManager;
use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayerConfig::from_env()?;
    info!(
        chain_id = config.chain_id,
        chunk_size = config.chunk_size,
        executors = config.executors.len(),
        "Starting relayer"
    );
    let executor = *config
        .executors
        .first()
        .ok_or_else(|| eyre::eyre!("no executor configured"))?;

    let handler = DexHandler::new(&config)?;
    let trader = devnet::trader()?;
    devnet::seed(&handler, trader.address())?;

    let count = config.chunk_size.min(3) as u64;
    let orders = devnet::demo_orders(&handler, &trader, count)?;
    let calldata: Bytes = IOrderManager::batchExecuteOrderCall { orders }
        .abi_encode()
        .into();

    let result = handler
        .handle_transaction(executor, &calldata)
        .wrap_err("batch reverted")?;
    let logs = handler.create_logs(&result);

    if let DexResult::BatchExecuted { orders, .. } = &result {
        for outcome in orders {
            info!(
                order_hash = %outcome.order_hash,
                from = %outcome.from,
                status = %outcome.result.status,
                "order relayed"
            );
        }
    }
    info!(
        logs = logs.len(),
        return_data = %result.return_data(),
        "batch complete"
    );

    Ok(())
}
