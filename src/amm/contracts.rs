//! Contract ABI definitions for the SaucerSwap routers and HTS tokens
//!
//! The v1 router follows the UniswapV2 periphery ABI; the v2 router and
//! quoter follow the UniswapV3 periphery ABI with WHBAR in place of WETH.

use alloy::sol;

sol! {
    /// ERC20 facade exposed by HTS tokens, used for router allowances
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// SaucerSwap v1 router (UniswapV2-style, HBAR in place of ETH)
    interface IRouterV1 {
        function getAmountsIn(uint256 amountOut, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function swapExactHBARForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
        function swapExactTokensForHBAR(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }

    /// SaucerSwap v2 swap router (UniswapV3-style)
    interface IRouterV2 {
        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function unwrapWHBAR(uint256 amountMinimum, address recipient) external payable;
    }

    /// SaucerSwap v2 quoter
    interface IQuoterV2 {
        function quoteExactOutput(bytes memory path, uint256 amountOut) external returns (uint256 amountIn, uint160[] memory sqrtPriceX96AfterList, uint32[] memory initializedTicksCrossedList, uint256 gasEstimate);
    }

    /// Per-pool immutables; every v2 pool carries its own fee tier
    interface IPoolV2 {
        function fee() external view returns (uint24);
    }
}
