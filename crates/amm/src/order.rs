//! Signed limit orders and their execution outcomes.

use crate::types::{Address, Bytes};
use std::fmt;

alloy::sol! {
    /// An off-chain signed request to swap `amountIn` of `path[0]` for at
    /// least `amountOutMin` of `path[1]`, valid until `deadline`.
    #[derive(Debug, PartialEq, Eq)]
    struct Order {
        uint256 amountIn;
        uint256 amountOutMin;
        address[] path;
        address from;
        address to;
        uint256 deadline;
        uint256 timestamp;
    }
}

impl Order {
    /// Token the signer pays with.
    pub fn token_in(&self) -> Option<Address> {
        self.path.first().copied()
    }

    /// Token the recipient receives.
    pub fn token_out(&self) -> Option<Address> {
        self.path.last().copied()
    }
}

/// An order together with its signature bytes (64-byte compact or 65-byte standard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedOrder {
    pub order: Order,
    pub signature: Bytes,
}

impl SignedOrder {
    pub fn new(order: Order, signature: impl Into<Bytes>) -> Self {
        Self {
            order,
            signature: signature.into(),
        }
    }
}

/// Terminal status of one order in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExecutionStatus {
    Filled = 0,
    AlreadyIssued = 1,
    InvalidStructure = 2,
    InvalidSignature = 3,
    WrongTokenAddress = 4,
    Expired = 5,
    InsufficientLiquidity = 6,
    SlippageTooHigh = 7,
    TransferFailed = 8,
    ExecutionFailed = 9,
}

impl ExecutionStatus {
    /// Numeric status code reported to relayers.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_filled(self) -> bool {
        self == ExecutionStatus::Filled
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Filled => "filled",
            ExecutionStatus::AlreadyIssued => "already issued",
            ExecutionStatus::InvalidStructure => "invalid structure",
            ExecutionStatus::InvalidSignature => "invalid signature",
            ExecutionStatus::WrongTokenAddress => "wrong token address",
            ExecutionStatus::Expired => "expired",
            ExecutionStatus::InsufficientLiquidity => "insufficient liquidity",
            ExecutionStatus::SlippageTooHigh => "slippage too high",
            ExecutionStatus::TransferFailed => "transfer failed",
            ExecutionStatus::ExecutionFailed => "execution failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one order, positionally matching the submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub status: ExecutionStatus,
}

impl From<ExecutionStatus> for ExecutionResult {
    fn from(status: ExecutionStatus) -> Self {
        Self {
            success: status.is_filled(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::U256;

    #[test]
    fn test_order_tokens() {
        let order = Order {
            amountIn: U256::from(1),
            amountOutMin: U256::ZERO,
            path: vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
            from: Address::repeat_byte(0xAA),
            to: Address::repeat_byte(0xAA),
            deadline: U256::from(100),
            timestamp: U256::from(1),
        };
        assert_eq!(order.token_in(), Some(Address::repeat_byte(0x01)));
        assert_eq!(order.token_out(), Some(Address::repeat_byte(0x02)));
    }

    #[test]
    fn test_result_from_status() {
        let filled = ExecutionResult::from(ExecutionStatus::Filled);
        assert!(filled.success);
        assert_eq!(filled.status.code(), 0);

        let expired = ExecutionResult::from(ExecutionStatus::Expired);
        assert!(!expired.success);
        assert_eq!(expired.status.code(), 5);
        assert_eq!(expired.status.to_string(), "expired");
    }
}
