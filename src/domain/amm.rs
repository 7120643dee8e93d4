// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Constant-product maths and unit helpers shared by the inspector and the strategy.

use crate::domain::constants::{
    BASE_FEE_CHANGE_DENOMINATOR, BPS_DENOMINATOR, V2_FEE_DENOMINATOR, V2_FEE_NUMERATOR,
    WEI_PER_ETHER,
};
use alloy::primitives::U256;

/// Uniswap V2 `getAmountOut` with the 0.3% fee.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    let amount_in_with_fee = amount_in.saturating_mul(U256::from(V2_FEE_NUMERATOR));
    let numerator = amount_in_with_fee.saturating_mul(reserve_out);
    let denominator = reserve_in
        .saturating_mul(U256::from(V2_FEE_DENOMINATOR))
        .saturating_add(amount_in_with_fee);
    if denominator.is_zero() {
        return U256::ZERO;
    }
    numerator / denominator
}

/// Lower `amount` by `bps` basis points (minimum-out for swaps).
pub fn apply_slippage(amount: U256, bps: u64) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(bps.min(BPS_DENOMINATOR));
    amount.saturating_mul(U256::from(keep)) / U256::from(BPS_DENOMINATOR)
}

/// `(in - out) / in * 10_000`; positive means loss.
pub fn slippage_bps(amount_in: U256, amount_out: U256) -> f64 {
    if amount_in.is_zero() {
        return f64::INFINITY;
    }
    let amount_in = u256_to_f64(amount_in);
    let amount_out = u256_to_f64(amount_out);
    (amount_in - amount_out) / amount_in * BPS_DENOMINATOR as f64
}

pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(0.0)
}

pub fn wei_to_ether(value: U256) -> f64 {
    u256_to_f64(value) / WEI_PER_ETHER
}

pub fn ether_to_wei(value: f64) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    U256::from((value * WEI_PER_ETHER) as u128)
}

/// EIP-1559 base fee projection for the block after `(base_fee, gas_used, gas_limit)`.
pub fn next_base_fee(base_fee: u128, gas_used: u64, gas_limit: u64) -> u128 {
    let target = u128::from((gas_limit / 2).max(1));
    let used = u128::from(gas_used);
    if used > target {
        let delta = base_fee.saturating_mul(used - target) / target / BASE_FEE_CHANGE_DENOMINATOR;
        base_fee.saturating_add(delta)
    } else {
        let delta = base_fee.saturating_mul(target - used) / target / BASE_FEE_CHANGE_DENOMINATOR;
        base_fee.saturating_sub(delta)
    }
}

/// Mark-to-market return of `amount` tokens bought at `buy_price`, net of `exit_cost` base units.
pub fn position_pnl_pct(
    amount: U256,
    buy_price: f64,
    reserve_token: U256,
    reserve_base: U256,
    exit_cost: U256,
) -> f64 {
    let cost = u256_to_f64(amount) * buy_price;
    if cost <= 0.0 {
        return 0.0;
    }
    let proceeds = u256_to_f64(get_amount_out(amount, reserve_token, reserve_base));
    (proceeds - u256_to_f64(exit_cost) - cost) / cost * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(v: u64) -> U256 {
        U256::from(v) * U256::from(1_000_000_000_000_000_000u128)
    }

    #[test]
    fn amount_out_applies_fee() {
        let out = get_amount_out(U256::from(1_000u64), U256::from(1_000_000u64), U256::from(1_000_000u64));
        assert_eq!(out, U256::from(996u64));
        assert_eq!(get_amount_out(U256::from(1u64), U256::ZERO, U256::from(5u64)), U256::ZERO);
    }

    #[test]
    fn slippage_is_positive_on_loss() {
        let bps = slippage_bps(U256::from(10_000u64), U256::from(9_950u64));
        assert!((bps - 50.0).abs() < 1e-9);
        assert!(slippage_bps(U256::ZERO, U256::ZERO).is_infinite());
    }

    #[test]
    fn apply_slippage_caps_at_full_amount() {
        assert_eq!(apply_slippage(U256::from(10_000u64), 1_000), U256::from(9_000u64));
        assert_eq!(apply_slippage(U256::from(10_000u64), 20_000), U256::ZERO);
    }

    #[test]
    fn base_fee_moves_by_an_eighth_at_extremes() {
        assert_eq!(next_base_fee(800, 30_000_000, 30_000_000), 900);
        assert_eq!(next_base_fee(800, 0, 30_000_000), 700);
        assert_eq!(next_base_fee(800, 15_000_000, 30_000_000), 800);
    }

    #[test]
    fn pnl_reflects_price_move() {
        let pnl = position_pnl_pct(
            ether(100),
            1.0,
            ether(1_000_000),
            ether(1_360_000),
            U256::ZERO,
        );
        assert!(pnl > 35.0 && pnl < 36.0, "pnl {pnl}");
    }

    #[test]
    fn pnl_is_net_of_exit_cost() {
        let gross = position_pnl_pct(ether(100), 1.0, ether(1_000_000), ether(1_000_000), U256::ZERO);
        let net = position_pnl_pct(ether(100), 1.0, ether(1_000_000), ether(1_000_000), ether(1));
        assert!((gross - net - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ether_conversion_round_trips_common_amounts() {
        assert_eq!(ether_to_wei(0.5), U256::from(500_000_000_000_000_000u128));
        assert!((wei_to_ether(ether(2)) - 2.0).abs() < 1e-12);
        assert_eq!(ether_to_wei(-1.0), U256::ZERO);
    }
}
