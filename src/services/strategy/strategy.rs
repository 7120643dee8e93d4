// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::time_utils::current_unix;
use crate::domain::amm::{apply_slippage, get_amount_out};
use crate::domain::error::AppError;
use crate::domain::types::{
    BlockEvent, CloseReason, ExecutionAck, ExecutionOrder, Pool, Position, ReportEvent,
    SimulationResult, TrackCommand,
};
use crate::infrastructure::network::gas::GasPolicy;
use crate::services::reporter::ReportSink;
use crate::services::strategy::inspector::{Inspection, InspectionMode, Inspector};
use crate::services::strategy::portfolio::{
    ExitPolicy, exit_quote, mark_to_market, realized_return_pct,
};
use crate::services::strategy::registry::{PoolRegistry, RegistryOutcome, RegistrySnapshot};
use crate::services::strategy::safety::CircuitBreaker;
use alloy::primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct StrategyConfig {
    pub watchlist_capacity: usize,
    pub max_inspect_attempts: u32,
    pub inspect_interval_secs: u64,
    /// Wei sent through the simulator for every inspection.
    pub probe_amount: U256,
    pub buy_amount: U256,
    pub order_slippage_bps: u64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub hold_max_duration_secs: u64,
    pub hard_stop_pnl_threshold: f64,
    pub max_liquidation_attempts: u32,
    pub failed_sell_pnl_penalty_pct: f64,
    pub gas: GasPolicy,
}

impl StrategyConfig {
    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy {
            take_profit_pct: self.take_profit_pct,
            stop_loss_pct: self.stop_loss_pct,
            hold_max_duration_secs: self.hold_max_duration_secs,
        }
    }
}

#[derive(Debug, Default)]
pub struct StrategyStats {
    pub blocks: AtomicU64,
    pub pools_discovered: AtomicU64,
    pub pools_admitted: AtomicU64,
    pub pools_evicted: AtomicU64,
    pub buy_orders: AtomicU64,
    pub sell_orders: AtomicU64,
    pub acks_succeeded: AtomicU64,
    pub acks_failed: AtomicU64,
    pub positions_closed: AtomicU64,
    pub watchlist_size: AtomicU64,
    pub inventory_size: AtomicU64,
    daily_pnl_bits: AtomicU64,
    pub auto_run: AtomicBool,
}

impl StrategyStats {
    pub fn daily_pnl(&self) -> f64 {
        f64::from_bits(self.daily_pnl_bits.load(Ordering::Relaxed))
    }

    fn set_daily_pnl(&self, pnl: f64) {
        self.daily_pnl_bits.store(pnl.to_bits(), Ordering::Relaxed);
    }
}

struct StrategyState {
    registry: PoolRegistry,
    /// Single global slot: the pool of the one buy order awaiting its ack.
    buy_in_flight: Option<Address>,
    /// New pools whose admission lookups failed transiently; retried next block.
    deferred: Vec<Pool>,
    auto_run: bool,
    breaker: CircuitBreaker,
    last_block_timestamp: Option<u64>,
}

/// Per-block decision pipeline and ack reconciliation over one shared registry.
pub struct Strategy {
    config: StrategyConfig,
    state: Mutex<StrategyState>,
    inspector: Inspector,
    orders: mpsc::UnboundedSender<ExecutionOrder>,
    tracking: mpsc::UnboundedSender<TrackCommand>,
    reports: Arc<dyn ReportSink>,
    stats: Arc<StrategyStats>,
}

impl Strategy {
    pub fn new(
        config: StrategyConfig,
        inspector: Inspector,
        orders: mpsc::UnboundedSender<ExecutionOrder>,
        tracking: mpsc::UnboundedSender<TrackCommand>,
        reports: Arc<dyn ReportSink>,
        stats: Arc<StrategyStats>,
    ) -> Self {
        stats.auto_run.store(true, Ordering::Relaxed);
        let state = StrategyState {
            registry: PoolRegistry::new(config.watchlist_capacity),
            buy_in_flight: None,
            deferred: Vec::new(),
            auto_run: true,
            breaker: CircuitBreaker::new(config.hard_stop_pnl_threshold),
            last_block_timestamp: None,
        };
        Self {
            config,
            state: Mutex::new(state),
            inspector,
            orders,
            tracking,
            reports,
            stats,
        }
    }

    pub fn stats(&self) -> Arc<StrategyStats> {
        self.stats.clone()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.state.lock().await.registry.snapshot()
    }

    pub async fn is_auto_run(&self) -> bool {
        self.state.lock().await.auto_run
    }

    pub async fn buy_in_flight(&self) -> bool {
        self.state.lock().await.buy_in_flight.is_some()
    }

    /// Operator re-arm of the circuit breaker.
    pub async fn resume(&self) {
        let mut state = self.state.lock().await;
        state.breaker.reset();
        state.auto_run = true;
        self.publish(&state);
    }

    pub async fn run_blocks(
        self: Arc<Self>,
        mut blocks: mpsc::Receiver<BlockEvent>,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "strategy", "Shutdown requested; block consumer stopping");
                    return Ok(());
                }
                maybe_event = blocks.recv() => {
                    match maybe_event {
                        Some(event) => self.on_block(event).await,
                        None => {
                            tracing::info!(target: "strategy", "Block feed closed; block consumer stopping");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    pub async fn run_acks(
        self: Arc<Self>,
        mut acks: mpsc::UnboundedReceiver<ExecutionAck>,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "strategy", "Shutdown requested; ack consumer stopping");
                    return Ok(());
                }
                maybe_ack = acks.recv() => {
                    match maybe_ack {
                        Some(ack) => self.on_ack(ack).await,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    pub async fn on_block(&self, event: BlockEvent) {
        self.stats.blocks.fetch_add(1, Ordering::Relaxed);
        if !event.new_pools.is_empty() {
            self.reports.enqueue(ReportEvent::block(&event));
            for pool in &event.new_pools {
                self.stats.pools_discovered.fetch_add(1, Ordering::Relaxed);
                self.reports.enqueue(ReportEvent::PoolDiscovered(pool.clone()));
            }
        }

        let due = {
            let mut state = self.state.lock().await;
            state.last_block_timestamp = Some(event.block_timestamp);
            apply_snapshots(&mut state.registry, &event);

            if state.breaker.roll(event.block_timestamp) {
                if state.auto_run {
                    tracing::warn!(
                        target: "strategy",
                        block = event.block_number,
                        pnl = state.breaker.daily_pnl(),
                        "Auto-run disabled by circuit breaker"
                    );
                    state.auto_run = false;
                }
                self.publish(&state);
                return;
            }
            if !state.auto_run {
                tracing::info!(target: "strategy", block = event.block_number, "Circuit breaker cleared; auto-run resumed");
                state.auto_run = true;
            }

            self.liquidation_pass(&mut state, &event);

            state
                .registry
                .watchlist()
                .iter()
                .filter(|p| p.due_for_inspection(event.block_timestamp, self.config.inspect_interval_secs))
                .cloned()
                .collect::<Vec<_>>()
        };

        if !due.is_empty() {
            let verdicts = self
                .inspector
                .evaluate(
                    &due,
                    self.config.probe_amount,
                    InspectionMode::Reinspection {
                        to_block: event.block_number,
                    },
                )
                .await;
            let mut state = self.state.lock().await;
            self.apply_reinspection(&mut state, &event, due, verdicts);
        }

        let candidates: Vec<Pool> = {
            let mut state = self.state.lock().await;
            let deferred = std::mem::take(&mut state.deferred);
            if state.registry.spare_capacity() == 0 {
                Vec::new()
            } else {
                let mut seen = HashSet::new();
                deferred
                    .into_iter()
                    .chain(event.new_pools.iter().cloned())
                    .filter(|p| !state.registry.contains(&p.address) && seen.insert(p.address))
                    .collect()
            }
        };
        if !candidates.is_empty() {
            let verdicts = self
                .inspector
                .evaluate(&candidates, self.config.probe_amount, InspectionMode::Admission)
                .await;
            let mut state = self.state.lock().await;
            self.admit(&mut state, &event, verdicts);
        }

        let state = self.state.lock().await;
        self.publish(&state);
    }

    fn liquidation_pass(&self, state: &mut StrategyState, event: &BlockEvent) {
        if state.registry.inventory().is_empty() {
            return;
        }
        let fees = self
            .config
            .gas
            .fees_for(event.base_fee, event.gas_used, event.gas_limit);
        let exit_cost = self.config.gas.projected_cost(&fees);
        let policy = self.config.exit_policy();

        let mut orders = Vec::new();
        for position in state.registry.positions_mut() {
            if position.liquidating {
                continue;
            }
            let pnl = mark_to_market(position, exit_cost);
            let Some(trigger) = policy.trigger(position, event.block_timestamp) else {
                continue;
            };
            position.liquidating = true;
            tracing::info!(
                target: "strategy",
                pool = %position.address(),
                pnl,
                trigger = trigger.as_str(),
                held_secs = position.held_for(event.block_timestamp),
                "Liquidating position"
            );
            orders.push(ExecutionOrder {
                block_number: event.block_number,
                block_timestamp: event.block_timestamp,
                pool: position.pool.clone(),
                amount_in: position.amount,
                amount_out_min: apply_slippage(exit_quote(position), self.config.order_slippage_bps),
                is_buy: false,
                account: position.account,
            });
        }
        for order in orders {
            self.stats.sell_orders.fetch_add(1, Ordering::Relaxed);
            self.emit(order);
        }
    }

    fn apply_reinspection(
        &self,
        state: &mut StrategyState,
        event: &BlockEvent,
        due: Vec<Pool>,
        verdicts: Vec<Inspection>,
    ) {
        let mut verdicts: HashMap<Address, Inspection> =
            verdicts.into_iter().map(|v| (v.address(), v)).collect();

        let mut matured: Vec<(Pool, f64)> = Vec::new();
        for pool in due {
            let result = match verdicts.remove(&pool.address) {
                Some(Inspection::Qualified(result)) => result,
                Some(Inspection::Unavailable(_)) => {
                    // attempts untouched, so the pool stays due next block
                    tracing::debug!(target: "strategy", pool = %pool.address, "Reinspection inconclusive; keeping pool");
                    continue;
                }
                Some(Inspection::Rejected(_)) | None => {
                    if state.registry.remove_from_watchlist(&pool.address) {
                        tracing::info!(target: "strategy", pool = %pool.address, "Evicting pool that failed reinspection");
                        self.evict(pool.address);
                    }
                    continue;
                }
            };
            // promoted or dropped while the inspector ran
            let Some(watched) = state.registry.watched_mut(&pool.address) else {
                continue;
            };
            watched.inspect_attempts += 1;
            watched.last_inspected_block = event.block_number;
            watched.verified |= result.pool.verified;
            tracing::debug!(
                target: "strategy",
                pool = %pool.address,
                attempts = watched.inspect_attempts,
                slippage_bps = result.slippage_bps,
                "Reinspection passed"
            );
            if watched.inspect_attempts >= self.config.max_inspect_attempts {
                matured.push((watched.clone(), result.slippage_bps));
            }
        }

        matured.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (pool, slippage) in matured {
            state.registry.remove_from_watchlist(&pool.address);
            if let Some(pending) = state.buy_in_flight {
                tracing::info!(target: "strategy", pool = %pool.address, pending = %pending, "Buy already in flight; dropping matured pool");
                self.evict(pool.address);
                continue;
            }
            state.buy_in_flight = Some(pool.address);
            let expected = get_amount_out(self.config.buy_amount, pool.reserve_base, pool.reserve_token);
            tracing::info!(
                target: "strategy",
                pool = %pool.address,
                token = %pool.token,
                slippage_bps = slippage,
                "Buying matured pool"
            );
            self.stats.buy_orders.fetch_add(1, Ordering::Relaxed);
            self.emit(ExecutionOrder {
                block_number: event.block_number,
                block_timestamp: event.block_timestamp,
                pool,
                amount_in: self.config.buy_amount,
                amount_out_min: apply_slippage(expected, self.config.order_slippage_bps),
                is_buy: true,
                account: None,
            });
        }
    }

    fn admit(&self, state: &mut StrategyState, event: &BlockEvent, verdicts: Vec<Inspection>) {
        let mut results: Vec<SimulationResult> = Vec::new();
        for verdict in verdicts {
            match verdict {
                Inspection::Qualified(result) => results.push(result),
                Inspection::Unavailable(pool) if state.deferred.len() < self.config.watchlist_capacity => {
                    tracing::debug!(target: "strategy", pool = %pool.address, "Admission inconclusive; retrying next block");
                    state.deferred.push(pool);
                }
                Inspection::Unavailable(_) | Inspection::Rejected(_) => {}
            }
        }
        results.sort_by(|a, b| a.slippage_bps.total_cmp(&b.slippage_bps));
        for result in results {
            let address = result.pool.address;
            match state.registry.add_to_watchlist(result.pool) {
                RegistryOutcome::Added => {}
                RegistryOutcome::CapacityReached => break,
                _ => continue,
            }
            let Some(watched) = state.registry.watched_mut(&address) else {
                continue;
            };
            watched.inspect_attempts = 1;
            watched.last_inspected_block = event.block_number;
            let pool = watched.clone();
            tracing::info!(
                target: "strategy",
                pool = %address,
                token = %pool.token,
                slippage_bps = result.slippage_bps,
                "Pool admitted to watchlist"
            );
            self.stats.pools_admitted.fetch_add(1, Ordering::Relaxed);
            self.track(TrackCommand::Watch(pool));
        }
    }

    pub async fn on_ack(&self, ack: ExecutionAck) {
        tracing::info!(
            target: "strategy",
            pool = %ack.pool.address,
            side = if ack.is_buy { "buy" } else { "sell" },
            status = %ack.tx_status,
            lead_block = ack.lead_block,
            realized_block = ack.realized_block,
            "Execution ack"
        );
        if ack.succeeded() {
            self.stats.acks_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.acks_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.reports.enqueue(ReportEvent::Execution(ack.clone()));
        self.track(TrackCommand::from_ack(&ack));

        let mut state = self.state.lock().await;
        let now = state.last_block_timestamp.unwrap_or_else(current_unix);
        match (ack.is_buy, ack.succeeded()) {
            (true, true) => {
                self.release_buy_slot(&mut state, ack.pool.address);
                let position =
                    Position::open(ack.pool.clone(), ack.amount_in, ack.amount_out, now, ack.account);
                let opened = ReportEvent::PositionOpened {
                    pool: position.pool.clone(),
                    amount: position.amount,
                    buy_price: position.buy_price,
                    opened_at: position.purchased_at,
                };
                if state.registry.promote_to_inventory(position) == RegistryOutcome::Promoted {
                    self.reports.enqueue(opened);
                }
            }
            (true, false) => self.release_buy_slot(&mut state, ack.pool.address),
            (false, true) => match state.registry.remove_from_inventory(&ack.pool.address) {
                Some(position) => {
                    // a confirmed sell only proves the sold pool's own buy landed
                    if state.buy_in_flight == Some(position.address()) {
                        state.buy_in_flight = None;
                    }
                    let pct = realized_return_pct(&position, ack.amount_out);
                    self.close(&mut state, position.address(), pct, now, CloseReason::Sold);
                }
                None => {
                    tracing::warn!(target: "strategy", pool = %ack.pool.address, "Sell ack for a pool not in inventory; ignoring");
                }
            },
            (false, false) => self.on_failed_sell(&mut state, &ack, now),
        }
        self.publish(&state);
    }

    fn release_buy_slot(&self, state: &mut StrategyState, pool: Address) {
        match state.buy_in_flight {
            Some(pending) if pending != pool => {
                tracing::warn!(target: "strategy", pool = %pool, pending = %pending, "Buy ack does not match the in-flight buy; slot kept");
            }
            _ => state.buy_in_flight = None,
        }
    }

    fn on_failed_sell(&self, state: &mut StrategyState, ack: &ExecutionAck, now: u64) {
        let Some(position) = state.registry.position_mut(&ack.pool.address) else {
            tracing::warn!(target: "strategy", pool = %ack.pool.address, "Failed sell for a pool not in inventory; ignoring");
            return;
        };
        position.liquidating = false;
        position.liquidation_attempts += 1;
        if position.liquidation_attempts < self.config.max_liquidation_attempts {
            tracing::warn!(
                target: "strategy",
                pool = %ack.pool.address,
                attempts = position.liquidation_attempts,
                reason = ack.reason.as_deref().unwrap_or("reverted"),
                "Sell failed; will retry"
            );
            return;
        }

        let Some(position) = state.registry.remove_from_inventory(&ack.pool.address) else {
            return;
        };
        tracing::error!(
            target: "strategy",
            pool = %position.address(),
            attempts = position.liquidation_attempts,
            penalty = self.config.failed_sell_pnl_penalty_pct,
            "Sell attempts exhausted; writing position off"
        );
        if let Some(creator) = position.pool.creator {
            self.reports.enqueue(ReportEvent::CreatorBlacklisted {
                creator,
                reason: "unsellable position".into(),
                at: now,
            });
        }
        self.close(
            state,
            position.address(),
            self.config.failed_sell_pnl_penalty_pct,
            now,
            CloseReason::ForcedAfterFailedSells,
        );
        self.track(TrackCommand::Untrack(position.address()));
    }

    fn close(&self, state: &mut StrategyState, pool: Address, pct: f64, now: u64, reason: CloseReason) {
        self.stats.positions_closed.fetch_add(1, Ordering::Relaxed);
        if state.breaker.record(pct) && state.auto_run {
            tracing::warn!(target: "strategy", pnl = state.breaker.daily_pnl(), "Auto-run disabled by circuit breaker");
            state.auto_run = false;
        }
        tracing::info!(target: "strategy", pool = %pool, pnl = pct, reason = reason.as_str(), "Position closed");
        self.reports.enqueue(ReportEvent::PositionClosed {
            pool,
            closed_at: now,
            realized_pnl_pct: pct,
            reason,
        });
    }

    fn evict(&self, pool: Address) {
        self.stats.pools_evicted.fetch_add(1, Ordering::Relaxed);
        self.track(TrackCommand::Untrack(pool));
    }

    fn emit(&self, order: ExecutionOrder) {
        if self.orders.send(order).is_err() {
            tracing::error!(target: "strategy", "Execution gateway is gone; order dropped");
        }
    }

    fn track(&self, cmd: TrackCommand) {
        if self.tracking.send(cmd).is_err() {
            tracing::debug!(target: "strategy", "Block feed is gone; tracking update dropped");
        }
    }

    fn publish(&self, state: &StrategyState) {
        self.stats
            .watchlist_size
            .store(state.registry.watchlist().len() as u64, Ordering::Relaxed);
        self.stats
            .inventory_size
            .store(state.registry.inventory().len() as u64, Ordering::Relaxed);
        self.stats.set_daily_pnl(state.breaker.daily_pnl());
        self.stats.auto_run.store(state.auto_run, Ordering::Relaxed);
    }
}

/// Fold the feed's refreshed reserves and swap flags into whichever list holds each pool.
fn apply_snapshots(registry: &mut PoolRegistry, event: &BlockEvent) {
    for pool in event
        .watchlist_snapshot
        .iter()
        .chain(event.inventory_snapshot.iter())
    {
        registry.update_reserves(&pool.address, pool.reserve_token, pool.reserve_base);
        registry.mark_activity(&pool.address, pool.has_buy_seen, pool.has_sell_seen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TxStatus;
    use crate::services::strategy::inspector::InspectorConfig;
    use crate::testing::{RecordingSink, StaticSimulator, header};

    struct Harness {
        strategy: Strategy,
        orders: mpsc::UnboundedReceiver<ExecutionOrder>,
        tracking: mpsc::UnboundedReceiver<TrackCommand>,
        sink: Arc<RecordingSink>,
    }

    fn config() -> StrategyConfig {
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
            max_liquidation_attempts: 2,
            failed_sell_pnl_penalty_pct: -100.0,
            gas: GasPolicy {
                gas_limit: 200_000,
                max_fee_per_gas: 50_000_000_000,
                max_priority_fee_per_gas: 2_000_000_000,
            },
        }
    }

    fn harness() -> Harness {
        let inspector = Inspector::new(
            InspectorConfig {
                min_reserve: U256::from(5u64),
                max_reserve: U256::from(50u64),
                slippage_min_bps: 30.0,
                slippage_max_bps: 100.0,
                concurrency: 5,
                reputation_enabled: false,
            },
            Arc::new(StaticSimulator::default()),
            None,
        );
        let (order_tx, orders) = mpsc::unbounded_channel();
        let (track_tx, tracking) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::default());
        let strategy = Strategy::new(
            config(),
            inspector,
            order_tx,
            track_tx,
            sink.clone(),
            Arc::new(StrategyStats::default()),
        );
        Harness {
            strategy,
            orders,
            tracking,
            sink,
        }
    }

    fn held_pool() -> Pool {
        Pool::new(Address::from([1; 20]), Address::from([2; 20]), 0, 0, 1)
            .with_reserves(U256::from(1_000_000u64), U256::from(1_000_000u64))
            .with_creator(Some(Address::from([3; 20])))
    }

    fn ack(pool: &Pool, is_buy: bool, status: TxStatus, amount_out: u64) -> ExecutionAck {
        ExecutionAck {
            lead_block: 1,
            realized_block: 2,
            tx_hash: None,
            tx_status: status,
            pool: pool.clone(),
            amount_in: U256::from(100u64),
            amount_out: U256::from(amount_out),
            is_buy,
            account: None,
            reason: None,
        }
    }

    #[tokio::test]
    async fn exhausted_sells_force_close_and_blacklist_creator() {
        let mut h = harness();
        let pool = held_pool();
        h.strategy.on_ack(ack(&pool, true, TxStatus::Success, 100)).await;
        assert_eq!(h.strategy.snapshot().await.inventory.len(), 1);

        h.strategy.on_ack(ack(&pool, false, TxStatus::Failed, 0)).await;
        assert_eq!(h.strategy.snapshot().await.inventory.len(), 1);
        h.strategy.on_ack(ack(&pool, false, TxStatus::Failed, 0)).await;
        assert!(h.strategy.snapshot().await.inventory.is_empty());

        let events = h.sink.events();
        assert!(events.iter().any(|e| matches!(
            e,
            ReportEvent::CreatorBlacklisted { creator, .. } if *creator == Address::from([3; 20])
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ReportEvent::PositionClosed { reason: CloseReason::ForcedAfterFailedSells, realized_pnl_pct, .. }
                if *realized_pnl_pct == -100.0
        )));

        let mut last = None;
        while let Ok(cmd) = h.tracking.try_recv() {
            last = Some(cmd);
        }
        assert_eq!(last, Some(TrackCommand::Untrack(pool.address)));
        assert!(h.orders.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_sell_clears_liquidating_flag_for_retry() {
        let mut h = harness();
        let pool = held_pool();
        h.strategy.on_ack(ack(&pool, true, TxStatus::Success, 100)).await;

        // price doubles: take profit on the next block
        let mut event = BlockEvent::from_header(&header(5, 100));
        event.inventory_snapshot = vec![held_pool().with_reserves(U256::from(1_000_000u64), U256::from(2_000_000u64))];
        h.strategy.on_block(event.clone()).await;
        assert!(!h.orders.try_recv().expect("sell").is_buy);

        // still liquidating: no duplicate
        h.strategy.on_block(event.clone()).await;
        assert!(h.orders.try_recv().is_err());

        h.strategy.on_ack(ack(&pool, false, TxStatus::Failed, 0)).await;
        h.strategy.on_block(event).await;
        assert!(!h.orders.try_recv().expect("retried sell").is_buy);
    }

    #[tokio::test]
    async fn unknown_sell_ack_is_ignored() {
        let h = harness();
        h.strategy.on_ack(ack(&held_pool(), false, TxStatus::Success, 500)).await;
        let snap = h.strategy.snapshot().await;
        assert!(snap.inventory.is_empty() && snap.watchlist.is_empty());
        assert_eq!(h.strategy.stats().positions_closed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn resume_rearms_after_trip() {
        let h = harness();
        let pool = held_pool();
        h.strategy.on_ack(ack(&pool, true, TxStatus::Success, 100)).await;
        // proceeds of 0 on a cost of 100 is -100%; twice trips -199
        h.strategy.on_ack(ack(&pool, false, TxStatus::Success, 0)).await;
        let other = Pool::new(Address::from([9; 20]), Address::from([8; 20]), 0, 0, 1);
        h.strategy.on_ack(ack(&other, true, TxStatus::Success, 100)).await;
        h.strategy.on_ack(ack(&other, false, TxStatus::Success, 0)).await;
        assert!(!h.strategy.is_auto_run().await);
        assert!(!h.strategy.stats().auto_run.load(Ordering::Relaxed));

        h.strategy.resume().await;
        assert!(h.strategy.is_auto_run().await);
        assert_eq!(h.strategy.stats().daily_pnl(), 0.0);
    }
}
