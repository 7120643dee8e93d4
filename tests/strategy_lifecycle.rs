// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

mod common;

use alloy::primitives::U256;
use common::{Harness, ack, block, config, pool};
use oxidity_sniper::domain::types::{CloseReason, ReportEvent, TrackCommand, TxStatus};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn qualifying_new_pool_is_watchlisted_with_one_attempt() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);

    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;

    let snap = h.strategy.snapshot().await;
    assert_eq!(snap.watchlist.len(), 1);
    assert_eq!(snap.watchlist[0].address, p.address);
    assert_eq!(snap.watchlist[0].inspect_attempts, 1);
    assert!(snap.inventory.is_empty());
    assert!(matches!(h.drain_tracking().as_slice(), [TrackCommand::Watch(w)] if w.address == p.address));
    assert!(h.sink.events().iter().any(|e| matches!(e, ReportEvent::Block { new_pools: 1, .. })));
}

#[tokio::test]
async fn out_of_range_or_lossy_pools_are_not_admitted() {
    let h = Harness::new(config());
    let shallow = pool(1, 0, 60);
    let lossy = pool(2, 0, 10);
    let cheap = pool(3, 0, 10);
    h.simulator.set_slippage(shallow.address, 50);
    h.simulator.set_slippage(lossy.address, 100);
    h.simulator.set_slippage(cheap.address, 30);

    let mut event = block(1, 0);
    event.new_pools = vec![shallow, lossy, cheap];
    h.strategy.on_block(event).await;

    assert!(h.strategy.snapshot().await.watchlist.is_empty());
    // the shallow pool never reaches the simulator
    assert_eq!(h.simulator.calls(), 2);
}

#[tokio::test]
async fn reinspection_waits_for_the_interval() {
    let h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);
    let mut event = block(1, 0);
    event.new_pools = vec![p];
    h.strategy.on_block(event).await;
    assert_eq!(h.simulator.calls(), 1);

    h.strategy.on_block(block(2, 299)).await;
    assert_eq!(h.simulator.calls(), 1);

    h.strategy.on_block(block(3, 300)).await;
    assert_eq!(h.simulator.calls(), 2);
    assert_eq!(h.strategy.snapshot().await.watchlist[0].inspect_attempts, 2);
}

#[tokio::test]
async fn matured_pool_triggers_exactly_one_buy() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);
    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;

    h.strategy.on_block(block(2, 300)).await;
    h.strategy.on_block(block(3, 599)).await;
    assert!(h.drain_orders().is_empty());

    h.strategy.on_block(block(4, 600)).await;
    let orders = h.drain_orders();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].is_buy);
    assert_eq!(orders[0].pool.address, p.address);
    assert_eq!(orders[0].amount_in, U256::from(100u64));
    assert!(h.strategy.snapshot().await.watchlist.is_empty());
    assert!(h.strategy.buy_in_flight().await);

    h.strategy.on_block(block(5, 900)).await;
    assert!(h.drain_orders().is_empty());
}

#[tokio::test]
async fn lowest_slippage_wins_when_pools_mature_together() {
    let mut h = Harness::new(config());
    let a = pool(1, 0, 10);
    let b = pool(2, 0, 10);
    h.simulator.set_slippage(a.address, 60);
    h.simulator.set_slippage(b.address, 40);
    let mut event = block(1, 0);
    event.new_pools = vec![a.clone(), b.clone()];
    h.strategy.on_block(event).await;

    h.strategy.on_block(block(2, 300)).await;
    h.strategy.on_block(block(3, 600)).await;

    let orders = h.drain_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].pool.address, b.address);
    assert!(h.strategy.snapshot().await.watchlist.is_empty());
    assert!(h.drain_tracking().contains(&TrackCommand::Untrack(a.address)));
}

#[tokio::test]
async fn no_second_buy_until_the_first_is_acked() {
    let mut h = Harness::new(config());
    let a = pool(1, 0, 10);
    let c = pool(3, 300, 10);
    h.simulator.set_slippage(a.address, 50);
    h.simulator.set_slippage(c.address, 50);

    let mut first = block(1, 0);
    first.new_pools = vec![a.clone()];
    h.strategy.on_block(first).await;
    let mut second = block(2, 300);
    second.new_pools = vec![c.clone()];
    h.strategy.on_block(second).await;

    h.strategy.on_block(block(3, 600)).await;
    let orders = h.drain_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].pool.address, a.address);

    // c matures while a's buy is still open: evicted, no order
    h.strategy.on_block(block(4, 900)).await;
    assert!(h.drain_orders().is_empty());
    let snap = h.strategy.snapshot().await;
    assert!(snap.watchlist.is_empty());
    assert_eq!(h.strategy.stats().pools_evicted.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn failed_buy_ack_frees_the_slot() {
    let mut h = Harness::new(config());
    let a = pool(1, 0, 10);
    let c = pool(3, 300, 10);
    h.simulator.set_slippage(a.address, 50);
    h.simulator.set_slippage(c.address, 50);

    let mut first = block(1, 0);
    first.new_pools = vec![a.clone()];
    h.strategy.on_block(first).await;
    let mut second = block(2, 300);
    second.new_pools = vec![c.clone()];
    h.strategy.on_block(second).await;
    h.strategy.on_block(block(3, 600)).await;
    assert_eq!(h.drain_orders().len(), 1);

    h.strategy.on_ack(ack(&a, true, TxStatus::Failed, 100, 0)).await;
    assert!(!h.strategy.buy_in_flight().await);
    assert!(h.strategy.snapshot().await.inventory.is_empty());

    h.strategy.on_block(block(4, 900)).await;
    let orders = h.drain_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].pool.address, c.address);
}

#[tokio::test]
async fn pool_failing_reinspection_is_evicted() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);
    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;
    h.drain_tracking();

    h.simulator.revert(p.address);
    h.strategy.on_block(block(2, 300)).await;
    assert!(h.strategy.snapshot().await.watchlist.is_empty());
    assert_eq!(h.drain_tracking(), vec![TrackCommand::Untrack(p.address)]);
}

#[tokio::test]
async fn explorer_outage_keeps_watched_pool_for_next_block() {
    let mut h = Harness::with_reputation(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);
    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;
    assert_eq!(h.strategy.snapshot().await.watchlist.len(), 1);
    h.drain_tracking();

    h.reputation.set_offline(true);
    h.strategy.on_block(block(2, 300)).await;
    let snap = h.strategy.snapshot().await;
    assert_eq!(snap.watchlist.len(), 1);
    assert_eq!(snap.watchlist[0].inspect_attempts, 1);
    assert_eq!(snap.watchlist[0].last_inspected_block, 1);
    assert!(h.drain_tracking().is_empty());
    assert_eq!(h.strategy.stats().pools_evicted.load(Ordering::Relaxed), 0);

    h.reputation.set_offline(false);
    h.strategy.on_block(block(3, 301)).await;
    let snap = h.strategy.snapshot().await;
    assert_eq!(snap.watchlist.len(), 1);
    assert_eq!(snap.watchlist[0].inspect_attempts, 2);
    assert_eq!(snap.watchlist[0].last_inspected_block, 3);
}

#[tokio::test]
async fn unreachable_node_defers_admission_to_next_block() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_unavailable(p.address);
    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;
    assert!(h.strategy.snapshot().await.watchlist.is_empty());
    assert!(h.drain_tracking().is_empty());

    h.simulator.set_slippage(p.address, 50);
    h.strategy.on_block(block(2, 12)).await;
    let snap = h.strategy.snapshot().await;
    assert_eq!(snap.watchlist.len(), 1);
    assert_eq!(snap.watchlist[0].inspect_attempts, 1);
    assert!(matches!(h.drain_tracking().as_slice(), [TrackCommand::Watch(w)] if w.address == p.address));

    // a revert is final: no further retries
    let q = pool(2, 12, 10);
    let mut event = block(3, 24);
    event.new_pools = vec![q];
    h.strategy.on_block(event).await;
    let calls = h.simulator.calls();
    h.strategy.on_block(block(4, 36)).await;
    assert_eq!(h.simulator.calls(), calls);
}

#[tokio::test]
async fn confirmed_sell_does_not_free_another_pools_buy() {
    let mut h = Harness::new(config());
    let held = pool(1, 0, 10);
    let q = pool(2, 0, 10);
    let r = pool(3, 300, 10);
    h.simulator.set_slippage(q.address, 50);
    h.simulator.set_slippage(r.address, 50);

    let mut first = block(1, 0);
    first.new_pools = vec![q.clone()];
    h.strategy.on_block(first).await;
    h.strategy.on_ack(ack(&held, true, TxStatus::Success, 100, 100)).await;
    let mut second = block(2, 300);
    second.new_pools = vec![r.clone()];
    h.strategy.on_block(second).await;
    h.strategy.on_block(block(3, 600)).await;
    let buys: Vec<_> = h.drain_orders().into_iter().filter(|o| o.is_buy).collect();
    assert_eq!(buys.len(), 1);
    assert_eq!(buys[0].pool.address, q.address);

    h.strategy.on_ack(ack(&held, false, TxStatus::Success, 100, 120)).await;
    assert!(h.strategy.buy_in_flight().await);

    // r matures while q's buy is still open
    h.strategy.on_block(block(4, 900)).await;
    assert!(h.drain_orders().iter().all(|o| !o.is_buy));
    assert!(h.strategy.snapshot().await.watchlist.is_empty());

    h.strategy.on_ack(ack(&q, true, TxStatus::Failed, 100, 0)).await;
    assert!(!h.strategy.buy_in_flight().await);
}

#[tokio::test]
async fn watchlist_never_exceeds_capacity() {
    let mut cfg = config();
    cfg.watchlist_capacity = 2;
    let h = Harness::new(cfg);
    let pools: Vec<_> = (1..=3).map(|i| pool(i, 0, 10)).collect();
    h.simulator.set_slippage(pools[0].address, 70);
    h.simulator.set_slippage(pools[1].address, 40);
    h.simulator.set_slippage(pools[2].address, 50);

    let mut event = block(1, 0);
    event.new_pools = pools.clone();
    h.strategy.on_block(event).await;

    let snap = h.strategy.snapshot().await;
    assert_eq!(snap.watchlist.len(), 2);
    assert!(snap.watchlist.iter().all(|p| p.address != pools[0].address));

    // full: the next batch is not even probed
    let calls = h.simulator.calls();
    let late = pool(9, 10, 10);
    h.simulator.set_slippage(late.address, 50);
    let mut event = block(2, 10);
    event.new_pools = vec![late];
    h.strategy.on_block(event).await;
    assert_eq!(h.simulator.calls(), calls);
}

#[tokio::test]
async fn take_profit_sells_once_per_episode() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.strategy.on_block(block(1, 10)).await;
    h.strategy.on_ack(ack(&p, true, TxStatus::Success, 100, 100)).await;
    let snap = h.strategy.snapshot().await;
    let position = &snap.inventory[0];
    assert_eq!(position.buy_price, 1.0);
    assert_eq!(position.amount, U256::from(100u64));

    // 100 tokens now quote 135 base: +35%
    let mut event = block(2, 20);
    event.inventory_snapshot =
        vec![p.clone().with_reserves(U256::from(1_000_000u64), U256::from(1_355_000u64))];
    h.strategy.on_block(event.clone()).await;
    let orders = h.drain_orders();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].is_buy);
    assert_eq!(orders[0].amount_in, U256::from(100u64));
    assert!(h.strategy.snapshot().await.inventory[0].pnl > 30.0);

    event.block_number = 3;
    event.block_timestamp = 30;
    h.strategy.on_block(event).await;
    assert!(h.drain_orders().is_empty());
}

#[tokio::test]
async fn holding_timeout_liquidates_flat_position() {
    let mut h = Harness::new(config());
    let p = pool(1, 0, 10).with_reserves(U256::from(1_000_000u64), U256::from(1_000_000u64));
    h.strategy.on_block(block(1, 10)).await;
    h.strategy.on_ack(ack(&p, true, TxStatus::Success, 100, 100)).await;

    let mut event = block(2, 3_610);
    event.inventory_snapshot = vec![p.clone()];
    h.strategy.on_block(event).await;
    assert!(h.drain_orders().is_empty());

    let mut event = block(3, 3_611);
    event.inventory_snapshot = vec![p];
    h.strategy.on_block(event).await;
    assert_eq!(h.drain_orders().len(), 1);
}

#[tokio::test]
async fn buy_then_sell_restores_the_empty_registry() {
    let h = Harness::new(config());
    let before = h.strategy.snapshot().await;
    let p = pool(1, 0, 10);

    h.strategy.on_ack(ack(&p, true, TxStatus::Success, 100, 100)).await;
    assert_eq!(h.strategy.snapshot().await.inventory.len(), 1);
    h.strategy.on_ack(ack(&p, false, TxStatus::Success, 100, 120)).await;

    assert_eq!(h.strategy.snapshot().await, before);
    let closed = h.sink.events().into_iter().find_map(|e| match e {
        ReportEvent::PositionClosed {
            realized_pnl_pct,
            reason,
            ..
        } => Some((realized_pnl_pct, reason)),
        _ => None,
    });
    let (pct, reason) = closed.expect("position closed");
    assert!((pct - 20.0).abs() < 1e-9);
    assert_eq!(reason, CloseReason::Sold);
    assert!((h.strategy.stats().daily_pnl() - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn watchlisted_pool_moves_to_inventory_on_buy() {
    let h = Harness::new(config());
    let p = pool(1, 0, 10);
    h.simulator.set_slippage(p.address, 50);
    let mut event = block(1, 0);
    event.new_pools = vec![p.clone()];
    h.strategy.on_block(event).await;

    h.strategy.on_ack(ack(&p, true, TxStatus::Success, 100, 100)).await;
    let snap = h.strategy.snapshot().await;
    assert!(snap.watchlist.is_empty());
    assert_eq!(snap.inventory.len(), 1);
}

#[tokio::test]
async fn circuit_breaker_halts_orders_until_reset() {
    let mut h = Harness::new(config());
    h.strategy.on_block(block(1, 100)).await;
    let held = pool(1, 0, 10);
    h.strategy.on_ack(ack(&held, true, TxStatus::Success, 100, 100)).await;

    for tag in [2u8, 3] {
        let loser = pool(tag, 0, 10);
        h.strategy.on_ack(ack(&loser, true, TxStatus::Success, 100, 100)).await;
        h.strategy.on_ack(ack(&loser, false, TxStatus::Success, 100, 0)).await;
    }
    assert_eq!(h.strategy.stats().daily_pnl(), -200.0);
    assert!(!h.strategy.is_auto_run().await);

    let mut event = block(2, 200);
    event.inventory_snapshot =
        vec![held.clone().with_reserves(U256::from(1_000_000u64), U256::from(1_355_000u64))];
    h.strategy.on_block(event.clone()).await;
    assert!(h.drain_orders().is_empty());
    assert!(!h.strategy.stats().auto_run.load(Ordering::Relaxed));

    h.strategy.resume().await;
    event.block_number = 3;
    h.strategy.on_block(event).await;
    assert_eq!(h.drain_orders().len(), 1);
}

#[tokio::test]
async fn circuit_breaker_clears_on_a_new_utc_day() {
    let h = Harness::new(config());
    h.strategy.on_block(block(1, 100)).await;
    for tag in [2u8, 3] {
        let loser = pool(tag, 0, 10);
        h.strategy.on_ack(ack(&loser, true, TxStatus::Success, 100, 100)).await;
        h.strategy.on_ack(ack(&loser, false, TxStatus::Success, 100, 0)).await;
    }
    h.strategy.on_block(block(2, 200)).await;
    assert!(!h.strategy.is_auto_run().await);

    h.strategy.on_block(block(3, 86_400 + 5)).await;
    assert!(h.strategy.is_auto_run().await);
    assert_eq!(h.strategy.stats().daily_pnl(), 0.0);
}
