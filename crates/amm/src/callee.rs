//! Flash-swap callback interface.

use crate::pool_manager::{PoolError, PoolManager};
use crate::types::{Address, Amount};

/// A contract that receives the callback of a swap called with non-empty `data`.
///
/// The callee runs after the pool has optimistically sent the requested
/// outputs and before the pool checks that enough input arrived. It must pay
/// the pool back (plus fee) from inside the callback or the swap fails.
pub trait FlashSwapCallee: Send + Sync {
    /// Called by `pair` on the callee registered at the swap's `to` address.
    fn on_flash_swap(
        &mut self,
        pool_manager: &mut PoolManager,
        pair: Address,
        sender: Address,
        amount0_out: Amount,
        amount1_out: Amount,
        data: &[u8],
    ) -> Result<(), PoolError>;
}
