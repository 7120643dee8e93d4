// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::seen_cache::SeenCache;
use crate::domain::constants::{
    FEED_CHANNEL_CAPACITY, FEED_FANOUT, RECONNECT_BACKOFF_SECS, SEEN_POOLS_CAPACITY,
    UNISWAP_V2_FACTORY_BASE, WETH_BASE,
};
use crate::domain::error::AppError;
use crate::domain::types::{BlockEvent, BlockHeader, Pool, TrackCommand};
use crate::infrastructure::data::abi::{
    decode_pair_created, decode_swap, decode_sync, pair_created_topic, swap_topic, sync_topic,
};
use crate::infrastructure::network::chain::ChainClient;
use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub factory: Address,
    /// Base asset every tracked pool must pair against.
    pub weth: Address,
    /// Consecutive failed reconnect cycles before the feed gives up.
    pub max_reconnect_attempts: u32,
    pub backoff: Duration,
    pub fanout: usize,
    pub seen_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            factory: UNISWAP_V2_FACTORY_BASE,
            weth: WETH_BASE,
            max_reconnect_attempts: 30,
            backoff: Duration::from_secs(RECONNECT_BACKOFF_SECS),
            fanout: FEED_FANOUT,
            seen_capacity: SEEN_POOLS_CAPACITY,
        }
    }
}

#[derive(Clone, Debug)]
struct TrackedPool {
    pool: Pool,
    held: bool,
}

/// Turns chain heads into `BlockEvent`s: new pairs, refreshed reserves and swap activity
/// for every pool the strategy asked to track.
pub struct BlockFeed {
    chain: Arc<dyn ChainClient>,
    config: FeedConfig,
    tracking: mpsc::UnboundedReceiver<TrackCommand>,
    tracked: HashMap<Address, TrackedPool>,
    seen_pools: SeenCache<Address>,
    last_block: Option<(u64, B256)>,
    shutdown: CancellationToken,
}

impl BlockFeed {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        config: FeedConfig,
        tracking: mpsc::UnboundedReceiver<TrackCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        let seen_pools = SeenCache::new(config.seen_capacity);
        Self {
            chain,
            config,
            tracking,
            tracked: HashMap::new(),
            seen_pools,
            last_block: None,
            shutdown,
        }
    }

    /// Run on a background task; the receiver is the block sequence.
    pub fn spawn(self) -> (mpsc::Receiver<BlockEvent>, JoinHandle<Result<(), AppError>>) {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    pub async fn run(mut self, out: mpsc::Sender<BlockEvent>) -> Result<(), AppError> {
        tracing::info!(target: "blocks", factory = %self.config.factory, "BlockFeed: subscribing to newHeads");
        let mut failures: u32 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(target: "blocks", "Shutdown requested; stopping block feed");
                return Ok(());
            }

            match self.chain.subscribe_blocks().await {
                Ok(mut stream) => {
                    tracing::info!(target: "blocks", "BlockFeed: subscribed to newHeads");
                    loop {
                        tokio::select! {
                            _ = self.shutdown.cancelled() => {
                                tracing::info!(target: "blocks", "Shutdown requested; exiting newHeads stream");
                                return Ok(());
                            }
                            maybe_header = stream.next() => {
                                match maybe_header {
                                    Some(header) => {
                                        failures = 0;
                                        if !self.forward(&header, &out).await {
                                            return Ok(());
                                        }
                                    }
                                    None => break,
                                }
                            }
                        }
                    }
                    tracing::warn!(target: "blocks", "BlockFeed: subscription ended, retrying after backoff");
                }
                Err(e) => {
                    tracing::warn!(target: "blocks", error = %e, "Block subscription failed; falling back to polling");
                    match self.poll_once(&out).await {
                        Ok(true) => failures = 0,
                        Ok(false) => return Ok(()),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "blocks", error = %e, failures, "Polling latest block failed");
                        }
                    }
                }
            }

            if failures >= self.config.max_reconnect_attempts {
                return Err(AppError::Connection(format!(
                    "chain unreachable after {failures} reconnect attempts"
                )));
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: "blocks", "Shutdown requested during block-feed backoff");
                    return Ok(());
                }
                _ = sleep(self.config.backoff) => {}
            }
        }
    }

    /// `Ok(false)` once the consumer is gone.
    async fn poll_once(&mut self, out: &mpsc::Sender<BlockEvent>) -> Result<bool, AppError> {
        match self.chain.latest_block().await? {
            Some(header) => Ok(self.forward(&header, out).await),
            None => {
                tracing::debug!(target: "blocks", "Polling latest block returned None");
                Ok(true)
            }
        }
    }

    async fn forward(&mut self, header: &BlockHeader, out: &mpsc::Sender<BlockEvent>) -> bool {
        let Some(event) = self.build_event(header).await else {
            return true;
        };
        tracing::debug!(
            target: "blocks",
            block = event.block_number,
            new_pools = event.new_pools.len(),
            watched = event.watchlist_snapshot.len(),
            held = event.inventory_snapshot.len(),
            "Block event ready"
        );
        out.send(event).await.is_ok()
    }

    /// Build the event for `header`; `None` for a block already emitted.
    pub async fn build_event(&mut self, header: &BlockHeader) -> Option<BlockEvent> {
        if let Some((number, hash)) = self.last_block {
            if number == header.number && hash == header.hash {
                return None;
            }
            if header.number <= number {
                tracing::warn!(
                    target: "blocks",
                    block = header.number,
                    previous = number,
                    "Reorg detected; re-emitting replaced block"
                );
            }
        }
        self.last_block = Some((header.number, header.hash));
        self.apply_tracking();

        let mut event = BlockEvent::from_header(header);
        match self.discover_pools(header).await {
            Ok(pools) => event.new_pools = pools,
            Err(e) => {
                tracing::warn!(target: "blocks", block = header.number, error = %e, "PairCreated scan failed")
            }
        }
        if let Err(e) = self.refresh_tracked(header.number).await {
            tracing::warn!(target: "blocks", block = header.number, error = %e, "Tracked pool refresh failed; snapshots are stale");
        }
        for tracked in self.tracked.values() {
            if tracked.held {
                event.inventory_snapshot.push(tracked.pool.clone());
            } else {
                event.watchlist_snapshot.push(tracked.pool.clone());
            }
        }
        Some(event)
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    fn apply_tracking(&mut self) {
        while let Ok(cmd) = self.tracking.try_recv() {
            match cmd {
                TrackCommand::Watch(pool) => {
                    self.tracked
                        .entry(pool.address)
                        .or_insert(TrackedPool { pool, held: false });
                }
                TrackCommand::Hold(pool) => {
                    self.tracked
                        .entry(pool.address)
                        .and_modify(|t| t.held = true)
                        .or_insert(TrackedPool { pool, held: true });
                }
                TrackCommand::Untrack(address) => {
                    self.tracked.remove(&address);
                }
            }
        }
    }

    async fn discover_pools(&self, header: &BlockHeader) -> Result<Vec<Pool>, AppError> {
        let logs = self
            .chain
            .get_logs(
                &[self.config.factory],
                &[pair_created_topic()],
                header.number,
                header.number,
            )
            .await?;

        let mut candidates = Vec::new();
        for log in &logs {
            let Some(created) = decode_pair_created(log) else {
                continue;
            };
            let (token, token_index) = if created.token0 == self.config.weth {
                (created.token1, 1u8)
            } else if created.token1 == self.config.weth {
                (created.token0, 0u8)
            } else {
                continue;
            };
            if !self.seen_pools.remember(created.pair).await {
                tracing::debug!(target: "blocks", pool = %created.pair, "Pair already seen; skipping replay");
                continue;
            }
            candidates.push((
                Pool::new(created.pair, token, token_index, header.timestamp, header.number),
                log.transaction_hash,
            ));
        }

        let chain = self.chain.clone();
        let pools = futures::stream::iter(candidates)
            .map(|(mut pool, tx_hash)| {
                let chain = chain.clone();
                async move {
                    match chain.get_reserves(pool.address).await {
                        Ok((r0, r1)) => pool.apply_pair_reserves(r0, r1),
                        Err(e) => {
                            tracing::debug!(target: "blocks", pool = %pool.address, error = %e, "Reserve fetch failed for new pool")
                        }
                    }
                    if let Some(hash) = tx_hash {
                        pool.creator = chain.transaction_sender(hash).await.ok().flatten();
                    }
                    pool
                }
            })
            .buffer_unordered(self.config.fanout.max(1))
            .collect::<Vec<_>>()
            .await;
        Ok(pools)
    }

    async fn refresh_tracked(&mut self, block: u64) -> Result<(), AppError> {
        if self.tracked.is_empty() {
            return Ok(());
        }
        let addresses: Vec<Address> = self.tracked.keys().copied().collect();
        let mut logs = self
            .chain
            .get_logs(&addresses, &[sync_topic(), swap_topic()], block, block)
            .await?;
        logs.sort_by_key(|log: &Log| log.log_index.unwrap_or_default());

        for log in &logs {
            let Some(tracked) = self.tracked.get_mut(&log.address()) else {
                continue;
            };
            let pool = &mut tracked.pool;
            if let Some((r0, r1)) = decode_sync(log) {
                pool.apply_pair_reserves(r0, r1);
            } else if let Some(swap) = decode_swap(log) {
                pool.has_buy_seen |= swap.is_buy(pool.token_index);
                pool.has_sell_seen |= swap.is_sell(pool.token_index);
            }
        }
        Ok(())
    }
}
