// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, address};

// =============================================================================
// CHAIN DEFAULTS (Base mainnet)
// =============================================================================

pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
pub const UNISWAP_V2_FACTORY_BASE: Address = address!("8909Dc15e40173Ff4699343b6eB8132c65e18eC6");
pub const UNISWAP_V2_ROUTER_BASE: Address = address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24");
pub const BASESCAN_API_URL: &str = "https://api.basescan.org/api";

// =============================================================================
// AMM & FEE CONSTANTS
// =============================================================================

/// Uniswap V2 swap fee expressed as numerator over `V2_FEE_DENOMINATOR`.
pub const V2_FEE_NUMERATOR: u64 = 997;
pub const V2_FEE_DENOMINATOR: u64 = 1000;
pub const BPS_DENOMINATOR: u64 = 10_000;
pub const WEI_PER_ETHER: f64 = 1e18;
pub const WEI_PER_GWEI: u128 = 1_000_000_000;
/// EIP-1559 base fee max change denominator.
pub const BASE_FEE_CHANGE_DENOMINATOR: u128 = 8;

// =============================================================================
// EXECUTION
// =============================================================================

pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
pub const APPROVE_GAS_LIMIT: u64 = 60_000;
/// Balance credited to the probing account during simulation calls (1000 ETH).
pub const PROBE_BALANCE_WEI: u128 = 1_000_000_000_000_000_000_000;

// =============================================================================
// FEED
// =============================================================================

pub const FEED_CHANNEL_CAPACITY: usize = 16;
pub const FEED_FANOUT: usize = 5;
pub const SEEN_POOLS_CAPACITY: usize = 4096;
pub const RECONNECT_BACKOFF_SECS: u64 = 2;
