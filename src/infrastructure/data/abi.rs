// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy_sol_types::SolEvent;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniswapV2Factory {
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256 index);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniswapV2Pair {
        event Sync(uint112 reserve0, uint112 reserve1);
        event Swap(address indexed sender, uint256 amount0In, uint256 amount1In, uint256 amount0Out, uint256 amount1Out, address indexed to);

        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniV2Router {
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) payable returns (uint256[] memory amounts);
        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) returns (uint256[] memory amounts);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract ERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }

    /// Probe contract: buys `token` with `msg.value` and sells it straight back.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract InspectorBot {
        function inspect(address token) external payable returns (uint256 amountIn, uint256 amountOut);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairCreatedLog {
    pub token0: Address,
    pub token1: Address,
    pub pair: Address,
}

/// Decoded `Swap` amounts, indexed by pair side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapAmounts {
    pub amount_in: [U256; 2],
    pub amount_out: [U256; 2],
}

impl SwapAmounts {
    /// Base asset went in, so somebody bought the token.
    pub fn is_buy(&self, token_index: u8) -> bool {
        let base = 1 - usize::from(token_index.min(1));
        !self.amount_in[base].is_zero()
    }

    pub fn is_sell(&self, token_index: u8) -> bool {
        !self.amount_in[usize::from(token_index.min(1))].is_zero()
    }
}

pub fn decode_pair_created(log: &Log) -> Option<PairCreatedLog> {
    let decoded = UniswapV2Factory::PairCreated::decode_log(&log.inner).ok()?;
    Some(PairCreatedLog {
        token0: decoded.data.token0,
        token1: decoded.data.token1,
        pair: decoded.data.pair,
    })
}

pub fn decode_sync(log: &Log) -> Option<(U256, U256)> {
    let decoded = UniswapV2Pair::Sync::decode_log(&log.inner).ok()?;
    Some((U256::from(decoded.data.reserve0), U256::from(decoded.data.reserve1)))
}

pub fn decode_swap(log: &Log) -> Option<SwapAmounts> {
    let decoded = UniswapV2Pair::Swap::decode_log(&log.inner).ok()?;
    let swap = decoded.data;
    Some(SwapAmounts {
        amount_in: [swap.amount0In, swap.amount1In],
        amount_out: [swap.amount0Out, swap.amount1Out],
    })
}

/// Output of the last `Swap` emitted by `pool` in a receipt: tokens on a buy, base on a sell.
pub fn realized_amount_out(logs: &[Log], pool: Address, token_index: u8, is_buy: bool) -> Option<U256> {
    let token_side = usize::from(token_index.min(1));
    let side = if is_buy { token_side } else { 1 - token_side };
    logs.iter()
        .filter(|log| log.address() == pool)
        .filter_map(decode_swap)
        .last()
        .map(|swap| swap.amount_out[side])
}

pub fn pair_created_topic() -> alloy::primitives::B256 {
    UniswapV2Factory::PairCreated::SIGNATURE_HASH
}

pub fn sync_topic() -> alloy::primitives::B256 {
    UniswapV2Pair::Sync::SIGNATURE_HASH
}

pub fn swap_topic() -> alloy::primitives::B256 {
    UniswapV2Pair::Swap::SIGNATURE_HASH
}
