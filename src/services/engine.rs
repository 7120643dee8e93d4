// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use crate::infrastructure::data::db::Database;
use crate::infrastructure::network::block_feed::{BlockFeed, FeedConfig};
use crate::infrastructure::network::chain::ChainClient;
use crate::services::metrics::spawn_metrics_server;
use crate::services::reporter::{ChannelReportSink, Reporter};
use crate::services::signer::SignerPool;
use crate::services::strategy::execution::gateway::{ExecutionGateway, GatewayConfig};
use crate::services::strategy::inspector::Inspector;
use crate::services::strategy::strategy::{Strategy, StrategyConfig, StrategyStats};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Owns the wiring: one block feed, the strategy's block and ack consumers, the
/// execution gateway and the reporter, all stopped by one cancellation token.
pub struct Engine {
    chain: Arc<dyn ChainClient>,
    db: Database,
    inspector: Inspector,
    signers: SignerPool,
    strategy_config: StrategyConfig,
    feed_config: FeedConfig,
    gateway_config: GatewayConfig,
    metrics_port: Option<u16>,
    shutdown: CancellationToken,
}

impl Engine {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        db: Database,
        inspector: Inspector,
        signers: SignerPool,
        strategy_config: StrategyConfig,
        feed_config: FeedConfig,
        gateway_config: GatewayConfig,
        metrics_port: Option<u16>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            chain,
            db,
            inspector,
            signers,
            strategy_config,
            feed_config,
            gateway_config,
            metrics_port,
            shutdown,
        }
    }

    pub async fn run(self) -> Result<(), AppError> {
        let (track_tx, track_rx) = mpsc::unbounded_channel();
        let (order_tx, order_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let (sink, report_rx) = ChannelReportSink::new();

        let reporter = Reporter::new(self.db.clone(), report_rx, self.shutdown.clone());
        let gateway = ExecutionGateway::new(self.chain.clone(), self.signers, self.gateway_config);
        let underfunded = gateway.preflight(self.strategy_config.buy_amount).await;
        if !underfunded.is_empty() {
            tracing::warn!(target: "executor", count = underfunded.len(), "Orders routed to underfunded accounts will fail");
        }

        let strategy = Arc::new(Strategy::new(
            self.strategy_config,
            self.inspector,
            order_tx,
            track_tx,
            Arc::new(sink),
            Arc::new(StrategyStats::default()),
        ));
        if let Some(port) = self.metrics_port {
            let _metrics_addr =
                spawn_metrics_server(port, strategy.clone(), self.shutdown.clone()).await;
        }

        let (blocks, feed_handle) =
            BlockFeed::new(self.chain, self.feed_config, track_rx, self.shutdown.clone()).spawn();
        let shutdown = self.shutdown.clone();
        let feed = async move {
            let res = feed_handle
                .await
                .map_err(|e| AppError::Unknown(e.into()))
                .and_then(|r| r);
            if let Err(e) = &res {
                tracing::error!(target: "blocks", error = %e, "Block feed terminated");
            }
            // no blocks means nothing left to decide on
            shutdown.cancel();
            res
        };

        let (feed_res, blocks_res, acks_res, gateway_res, reporter_res) = tokio::join!(
            feed,
            strategy.clone().run_blocks(blocks, self.shutdown.clone()),
            strategy.clone().run_acks(ack_rx, self.shutdown.clone()),
            gateway.run(order_rx, ack_tx, self.shutdown.clone()),
            reporter.run(),
        );
        tracing::info!(target: "strategy", "Engine stopped");
        feed_res?;
        blocks_res?;
        acks_res?;
        gateway_res?;
        reporter_res
    }
}
