//! Constant-product AMM exchange with a signed limit-order execution layer.
//!
//! This library provides:
//! - Token pairs with fee-adjusted constant-product swaps, liquidity shares,
//!   time-weighted price accumulators and flash swaps
//! - A factory that deploys pairs at deterministic addresses
//! - Exact-input and exact-output pricing over the live reserves
//! - Batched execution of typed-data signed orders with replay protection

pub mod callee;
pub mod config;
pub mod erc20;
pub mod events;
pub mod factory;
pub mod math;
pub mod order;
pub mod order_manager;
pub mod pair;
pub mod pool_manager;
pub mod pricing;
pub mod signature;
pub mod types;
pub mod uq112x112;

pub use callee::FlashSwapCallee;
pub use config::DexConfig;
pub use erc20::{Erc20, TokenError};
pub use events::Event;
pub use factory::{Factory, FactoryError, PairCreated};
pub use order::{ExecutionResult, ExecutionStatus, Order, SignedOrder};
pub use order_manager::{OrderManager, OrderManagerError};
pub use pair::{Pair, PairError, Reserves};
pub use pool_manager::{PoolError, PoolManager};
pub use pricing::{PricingError, ReserveSource};
pub use signature::{canonical_signature, OrderSignatureValidator, SignatureError};
pub use types::{Address, Amount, Bytes, TokenId, B256, U256};
pub use uq112x112::UQ112x112;
