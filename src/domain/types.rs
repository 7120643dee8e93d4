// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, B256, U256};
use std::fmt;

/// A pair discovered on the factory whose other side is the base asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pool {
    pub address: Address,
    /// The non-base asset.
    pub token: Address,
    /// Position of `token` inside the pair (0 or 1).
    pub token_index: u8,
    pub reserve_token: U256,
    pub reserve_base: U256,
    /// Timestamp of the block that created the pair.
    pub created_at: u64,
    pub discovered_block: u64,
    pub inspect_attempts: u32,
    pub last_inspected_block: u64,
    pub has_buy_seen: bool,
    pub has_sell_seen: bool,
    pub creator: Option<Address>,
    /// Cached positive answer from the reputation oracle.
    pub verified: bool,
}

impl Pool {
    pub fn new(
        address: Address,
        token: Address,
        token_index: u8,
        created_at: u64,
        discovered_block: u64,
    ) -> Self {
        Self {
            address,
            token,
            token_index,
            reserve_token: U256::ZERO,
            reserve_base: U256::ZERO,
            created_at,
            discovered_block,
            inspect_attempts: 0,
            last_inspected_block: discovered_block,
            has_buy_seen: false,
            has_sell_seen: false,
            creator: None,
            verified: false,
        }
    }

    pub fn with_reserves(mut self, reserve_token: U256, reserve_base: U256) -> Self {
        self.reserve_token = reserve_token;
        self.reserve_base = reserve_base;
        self
    }

    pub fn with_creator(mut self, creator: Option<Address>) -> Self {
        self.creator = creator;
        self
    }

    /// Map raw pair reserves onto token/base sides.
    pub fn apply_pair_reserves(&mut self, reserve0: U256, reserve1: U256) {
        let (token, base) = if self.token_index == 0 {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        };
        self.reserve_token = token;
        self.reserve_base = base;
    }

    /// Due once the pool is at least `max(attempts, 1) * interval` seconds old.
    pub fn due_for_inspection(&self, now: u64, interval_secs: u64) -> bool {
        let wait = u64::from(self.inspect_attempts.max(1)).saturating_mul(interval_secs);
        now.saturating_sub(self.created_at) >= wait
    }
}

/// An open holding derived from a successful buy.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub pool: Pool,
    /// Token units received by the buy.
    pub amount: U256,
    /// Base units paid per token unit.
    pub buy_price: f64,
    pub purchased_at: u64,
    pub pnl: f64,
    pub liquidation_attempts: u32,
    pub liquidating: bool,
    /// Account that holds the tokens; sells are routed back to it.
    pub account: Option<Address>,
}

impl Position {
    pub fn open(
        pool: Pool,
        amount_in: U256,
        amount_out: U256,
        purchased_at: u64,
        account: Option<Address>,
    ) -> Self {
        let buy_price = if amount_out.is_zero() {
            0.0
        } else {
            crate::domain::amm::u256_to_f64(amount_in) / crate::domain::amm::u256_to_f64(amount_out)
        };
        Self {
            pool,
            amount: amount_out,
            buy_price,
            purchased_at,
            pnl: 0.0,
            liquidation_attempts: 0,
            liquidating: false,
            account,
        }
    }

    pub fn address(&self) -> Address {
        self.pool.address
    }

    pub fn held_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.purchased_at)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    pub pool: Pool,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Positive values are losses.
    pub slippage_bps: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOrder {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub pool: Pool,
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub is_buy: bool,
    /// Explicit account routing; round-robin when `None`.
    pub account: Option<Address>,
}

impl ExecutionOrder {
    /// Swap deadline; falls back to `now` when the block timestamp is unknown.
    pub fn deadline(&self, delay_secs: u64, now: u64) -> u64 {
        let anchor = if self.block_timestamp == 0 {
            now
        } else {
            self.block_timestamp
        };
        anchor.saturating_add(delay_secs)
    }

    pub fn side(&self) -> &'static str {
        if self.is_buy { "buy" } else { "sell" }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Success => "SUCCESS",
            TxStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionAck {
    pub lead_block: u64,
    pub realized_block: u64,
    pub tx_hash: Option<B256>,
    pub tx_status: TxStatus,
    pub pool: Pool,
    pub amount_in: U256,
    pub amount_out: U256,
    pub is_buy: bool,
    pub account: Option<Address>,
    pub reason: Option<String>,
}

impl ExecutionAck {
    pub fn success(
        order: &ExecutionOrder,
        tx_hash: B256,
        realized_block: u64,
        amount_out: U256,
        account: Address,
    ) -> Self {
        Self {
            lead_block: order.block_number,
            realized_block,
            tx_hash: Some(tx_hash),
            tx_status: TxStatus::Success,
            pool: order.pool.clone(),
            amount_in: order.amount_in,
            amount_out,
            is_buy: order.is_buy,
            account: Some(account),
            reason: None,
        }
    }

    /// Terminal failure; the lead block stands in for the realized block.
    pub fn failed(
        order: &ExecutionOrder,
        tx_hash: Option<B256>,
        account: Option<Address>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            lead_block: order.block_number,
            realized_block: order.block_number,
            tx_hash,
            tx_status: TxStatus::Failed,
            pool: order.pool.clone(),
            amount_in: order.amount_in,
            amount_out: U256::ZERO,
            is_buy: order.is_buy,
            account,
            reason: Some(reason.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.tx_status == TxStatus::Success
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub timestamp: u64,
    pub base_fee: u128,
    pub gas_used: u64,
    pub gas_limit: u64,
}

/// Per-block snapshot handed to the strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockEvent {
    pub block_number: u64,
    pub block_hash: B256,
    pub block_timestamp: u64,
    pub base_fee: u128,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub new_pools: Vec<Pool>,
    pub inventory_snapshot: Vec<Pool>,
    pub watchlist_snapshot: Vec<Pool>,
}

impl BlockEvent {
    pub fn from_header(header: &BlockHeader) -> Self {
        Self {
            block_number: header.number,
            block_hash: header.hash,
            block_timestamp: header.timestamp,
            base_fee: header.base_fee,
            gas_used: header.gas_used,
            gas_limit: header.gas_limit,
            new_pools: Vec::new(),
            inventory_snapshot: Vec::new(),
            watchlist_snapshot: Vec::new(),
        }
    }
}

/// Pool-tracking instructions for the block feed.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackCommand {
    Watch(Pool),
    Hold(Pool),
    Untrack(Address),
}

impl TrackCommand {
    /// Tracking change implied by an execution outcome.
    pub fn from_ack(ack: &ExecutionAck) -> Self {
        match (ack.is_buy, ack.succeeded()) {
            (true, true) => TrackCommand::Hold(ack.pool.clone()),
            (true, false) => TrackCommand::Untrack(ack.pool.address),
            (false, true) => TrackCommand::Untrack(ack.pool.address),
            (false, false) => TrackCommand::Hold(ack.pool.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiquidationTrigger {
    TakeProfit,
    StopLoss,
    Timeout,
}

impl LiquidationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidationTrigger::TakeProfit => "take_profit",
            LiquidationTrigger::StopLoss => "stop_loss",
            LiquidationTrigger::Timeout => "timeout",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Sold,
    ForcedAfterFailedSells,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Sold => "sold",
            CloseReason::ForcedAfterFailedSells => "forced_after_failed_sells",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReportEvent {
    Block {
        block_number: u64,
        block_timestamp: u64,
        base_fee: u128,
        gas_used: u64,
        gas_limit: u64,
        new_pools: usize,
    },
    PoolDiscovered(Pool),
    Execution(ExecutionAck),
    PositionOpened {
        pool: Pool,
        amount: U256,
        buy_price: f64,
        opened_at: u64,
    },
    PositionClosed {
        pool: Address,
        closed_at: u64,
        realized_pnl_pct: f64,
        reason: CloseReason,
    },
    CreatorBlacklisted {
        creator: Address,
        reason: String,
        at: u64,
    },
}

impl ReportEvent {
    pub fn block(event: &BlockEvent) -> Self {
        ReportEvent::Block {
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
            base_fee: event.base_fee,
            gas_used: event.gas_used,
            gas_limit: event.gas_limit,
            new_pools: event.new_pools.len(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportEvent::Block { .. } => "block",
            ReportEvent::PoolDiscovered(_) => "pool",
            ReportEvent::Execution(_) => "execution",
            ReportEvent::PositionOpened { .. } => "position_opened",
            ReportEvent::PositionClosed { .. } => "position_closed",
            ReportEvent::CreatorBlacklisted { .. } => "blacklist",
        }
    }
}
