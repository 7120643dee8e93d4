// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

#![allow(dead_code, unused_imports)]

use alloy::primitives::{Address, B256, U256};
use oxidity_sniper::domain::types::{
    BlockEvent, ExecutionAck, ExecutionOrder, Pool, TrackCommand, TxStatus,
};
use oxidity_sniper::infrastructure::network::gas::GasPolicy;
use oxidity_sniper::infrastructure::network::reputation::ReputationOracle;
use oxidity_sniper::services::strategy::inspector::{Inspector, InspectorConfig};
use oxidity_sniper::services::strategy::strategy::{Strategy, StrategyConfig, StrategyStats};
pub use oxidity_sniper::testing::{MockChain, RecordingSink, StaticReputation, StaticSimulator};
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn config() -> StrategyConfig {
    StrategyConfig {
        watchlist_capacity: 4,
        max_inspect_attempts: 3,
        inspect_interval_secs: 300,
        probe_amount: U256::from(10_000u64),
        buy_amount: U256::from(100u64),
        order_slippage_bps: 1_000,
        take_profit_pct: 30.0,
        stop_loss_pct: -20.0,
        hold_max_duration_secs: 3_600,
        hard_stop_pnl_threshold: -199.0,
        max_liquidation_attempts: 3,
        failed_sell_pnl_penalty_pct: -100.0,
        gas: GasPolicy {
            gas_limit: 200_000,
            max_fee_per_gas: 50_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        },
    }
}

pub struct Harness {
    pub strategy: Arc<Strategy>,
    pub simulator: Arc<StaticSimulator>,
    pub reputation: Arc<StaticReputation>,
    pub sink: Arc<RecordingSink>,
    pub orders: mpsc::UnboundedReceiver<ExecutionOrder>,
    pub tracking: mpsc::UnboundedReceiver<TrackCommand>,
}

impl Harness {
    pub fn new(config: StrategyConfig) -> Self {
        Self::build(config, false)
    }

    /// Same as `new`, with the reputation fake consulted on every inspection.
    pub fn with_reputation(config: StrategyConfig) -> Self {
        Self::build(config, true)
    }

    fn build(config: StrategyConfig, reputation_enabled: bool) -> Self {
        let simulator = Arc::new(StaticSimulator::default());
        let reputation = Arc::new(StaticReputation::default());
        let oracle: Arc<dyn ReputationOracle> = reputation.clone();
        let inspector = Inspector::new(
            InspectorConfig {
                min_reserve: U256::from(5u64),
                max_reserve: U256::from(50u64),
                slippage_min_bps: 30.0,
                slippage_max_bps: 100.0,
                concurrency: 5,
                reputation_enabled,
            },
            simulator.clone(),
            Some(oracle),
        );
        let (order_tx, orders) = mpsc::unbounded_channel();
        let (track_tx, tracking) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::default());
        let strategy = Arc::new(Strategy::new(
            config,
            inspector,
            order_tx,
            track_tx,
            sink.clone(),
            Arc::new(StrategyStats::default()),
        ));
        Self {
            strategy,
            simulator,
            reputation,
            sink,
            orders,
            tracking,
        }
    }

    pub fn drain_orders(&mut self) -> Vec<ExecutionOrder> {
        let mut out = Vec::new();
        while let Ok(order) = self.orders.try_recv() {
            out.push(order);
        }
        out
    }

    pub fn drain_tracking(&mut self) -> Vec<TrackCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.tracking.try_recv() {
            out.push(cmd);
        }
        out
    }
}

/// A fresh pair with `reserve_base` base units and a deep token side.
pub fn pool(tag: u8, created_at: u64, reserve_base: u64) -> Pool {
    Pool::new(
        Address::from([tag; 20]),
        Address::from([tag.wrapping_add(100); 20]),
        0,
        created_at,
        1,
    )
    .with_reserves(U256::from(1_000_000u64), U256::from(reserve_base))
}

pub fn block(number: u64, timestamp: u64) -> BlockEvent {
    BlockEvent {
        block_number: number,
        block_hash: B256::from(U256::from(number)),
        block_timestamp: timestamp,
        base_fee: 0,
        gas_used: 0,
        gas_limit: 30_000_000,
        new_pools: Vec::new(),
        inventory_snapshot: Vec::new(),
        watchlist_snapshot: Vec::new(),
    }
}

pub fn ack(pool: &Pool, is_buy: bool, status: TxStatus, amount_in: u64, amount_out: u64) -> ExecutionAck {
    ExecutionAck {
        lead_block: 1,
        realized_block: 2,
        tx_hash: Some(B256::from([7; 32])),
        tx_status: status,
        pool: pool.clone(),
        amount_in: U256::from(amount_in),
        amount_out: U256::from(amount_out),
        is_buy,
        account: None,
        reason: None,
    }
}
