//! Local devnet bootstrap: demo tokens, a seeded pool and a funded trader.

use crate::dex::{DexError, DexHandler};
use crate::selectors::{Order, SignedOrder};
use alloy_primitives::{address, Address, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use eyre::WrapErr;
use tracing::info;

pub const WETH: Address = address!("4200000000000000000000000000000000000006");
pub const USDC: Address = address!("4200000000000000000000000000000000000007");

/// Well-known devnet key of the demo trader.
const TRADER_KEY: B256 = B256::new([0x11; 32]);
const LIQUIDITY_PROVIDER: Address = address!("00000000000000000000000000000000000000aa");

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64.pow(18))
}

pub fn trader() -> eyre::Result<PrivateKeySigner> {
    PrivateKeySigner::from_bytes(&TRADER_KEY).wrap_err("invalid trader key")
}

/// Deploy WETH and USDC, seed a 100/100 pool and fund the trader with approved WETH.
pub fn seed(handler: &DexHandler, trader: Address) -> Result<Address, DexError> {
    let mut engine = handler.write();
    let manager = engine.orders.address();
    let pools = &mut engine.pools;

    for token in [WETH, USDC] {
        pools.deploy_token(token)?;
        pools.mint_token(token, LIQUIDITY_PROVIDER, e18(1_000))?;
    }
    let pair = pools.create_pair(WETH, USDC)?;
    pools.transfer(WETH, LIQUIDITY_PROVIDER, pair, e18(100))?;
    pools.transfer(USDC, LIQUIDITY_PROVIDER, pair, e18(100))?;
    pools.mint(LIQUIDITY_PROVIDER, pair, LIQUIDITY_PROVIDER)?;

    pools.mint_token(WETH, trader, e18(10))?;
    pools.approve(WETH, trader, manager, U256::MAX)?;

    info!(%pair, %trader, "devnet seeded");
    Ok(pair)
}

/// Sign `count` WETH -> USDC orders of one WETH each, accepting any output.
pub fn demo_orders(
    handler: &DexHandler,
    trader: &PrivateKeySigner,
    count: u64,
) -> eyre::Result<Vec<SignedOrder>> {
    let engine = handler.read();
    let now = engine.pools.block_timestamp();

    (0..count)
        .map(|i| {
            let order = Order {
                amountIn: e18(1),
                amountOutMin: U256::ZERO,
                path: vec![WETH, USDC],
                from: trader.address(),
                to: trader.address(),
                deadline: U256::from(now + 3_600),
                timestamp: U256::from(now + i),
            };
            let hash = engine.orders.order_hash(&order.clone().into());
            let sig = trader.sign_hash_sync(&hash).wrap_err("failed to sign order")?;
            Ok(SignedOrder {
                order,
                signature: sig.as_bytes().to_vec().into(),
            })
        })
        .collect()
}
