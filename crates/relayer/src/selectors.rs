//! Order manager and pool ABI bindings and selectors.

use alloy_sol_macro::sol;

sol! {
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

    #[derive(Debug, PartialEq, Eq)]
    struct SignedOrder {
        Order order;
        bytes signature;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ExecutionResult {
        bool success;
        uint8 status;
    }

    interface IOrderManager {
        event OrderExecuted(bytes32 indexed orderHash, address indexed from, bool success, uint8 status);
        event ExecutorAdded(address indexed executor);
        event ExecutorRemoved(address indexed executor);

        function batchExecuteOrder(SignedOrder[] calldata orders) external returns (ExecutionResult[] memory results);
        function addExecutor(address executor) external;
        function removeExecutor(address executor) external;
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }

    interface IFactory {
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256 index);
    }

    interface IPair {
        event Mint(address indexed sender, uint256 amount0, uint256 amount1);
        event Burn(address indexed sender, uint256 amount0, uint256 amount1, address indexed to);
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );
        event Sync(uint112 reserve0, uint112 reserve1);
    }
}

impl From<Order> for amm::Order {
    fn from(order: Order) -> Self {
        amm::Order {
            amountIn: order.amountIn,
            amountOutMin: order.amountOutMin,
            path: order.path,
            from: order.from,
            to: order.to,
            deadline: order.deadline,
            timestamp: order.timestamp,
        }
    }
}

impl From<amm::Order> for Order {
    fn from(order: amm::Order) -> Self {
        Order {
            amountIn: order.amountIn,
            amountOutMin: order.amountOutMin,
            path: order.path,
            from: order.from,
            to: order.to,
            deadline: order.deadline,
            timestamp: order.timestamp,
        }
    }
}

impl From<SignedOrder> for amm::SignedOrder {
    fn from(signed: SignedOrder) -> Self {
        amm::SignedOrder::new(signed.order.into(), signed.signature)
    }
}

impl From<amm::ExecutionResult> for ExecutionResult {
    fn from(result: amm::ExecutionResult) -> Self {
        ExecutionResult {
            success: result.success,
            status: result.status.code(),
        }
    }
}

pub mod selectors {
    use super::IOrderManager;
    use alloy_sol_types::SolCall;

    pub const BATCH_EXECUTE_ORDER: [u8; 4] = IOrderManager::batchExecuteOrderCall::SELECTOR;
    pub const ADD_EXECUTOR: [u8; 4] = IOrderManager::addExecutorCall::SELECTOR;
    pub const REMOVE_EXECUTOR: [u8; 4] = IOrderManager::removeExecutorCall::SELECTOR;
    pub const GET_AMOUNTS_OUT: [u8; 4] = IOrderManager::getAmountsOutCall::SELECTOR;
}
