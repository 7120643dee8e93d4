// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::amm::{position_pnl_pct, u256_to_f64};
use crate::domain::types::{LiquidationTrigger, Position};
use alloy::primitives::U256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExitPolicy {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub hold_max_duration_secs: u64,
}

impl ExitPolicy {
    /// Price triggers win over the holding timeout.
    pub fn trigger(&self, position: &Position, now: u64) -> Option<LiquidationTrigger> {
        if position.pnl > self.take_profit_pct {
            Some(LiquidationTrigger::TakeProfit)
        } else if position.pnl < self.stop_loss_pct {
            Some(LiquidationTrigger::StopLoss)
        } else if position.held_for(now) > self.hold_max_duration_secs {
            Some(LiquidationTrigger::Timeout)
        } else {
            None
        }
    }
}

/// Refresh `position.pnl` from its pool's current reserves, net of `exit_cost` wei.
pub fn mark_to_market(position: &mut Position, exit_cost: U256) -> f64 {
    position.pnl = position_pnl_pct(
        position.amount,
        position.buy_price,
        position.pool.reserve_token,
        position.pool.reserve_base,
        exit_cost,
    );
    position.pnl
}

/// Realized return of selling `position` for `proceeds` base units.
pub fn realized_return_pct(position: &Position, proceeds: U256) -> f64 {
    let cost = u256_to_f64(position.amount) * position.buy_price;
    if cost <= 0.0 {
        return 0.0;
    }
    (u256_to_f64(proceeds) - cost) / cost * 100.0
}

/// Quote for selling the whole position into the pool right now.
pub fn exit_quote(position: &Position) -> U256 {
    crate::domain::amm::get_amount_out(
        position.amount,
        position.pool.reserve_token,
        position.pool.reserve_base,
    )
}
