// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::types::ReportEvent;
use crate::infrastructure::data::db::Database;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Fire-and-forget sink for state transitions. Never blocks the caller.
pub trait ReportSink: Send + Sync {
    fn enqueue(&self, event: ReportEvent);
}

#[derive(Clone)]
pub struct ChannelReportSink {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelReportSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelReportSink {
    fn enqueue(&self, event: ReportEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(target: "reporter", "Reporter gone; dropping event");
        }
    }
}

/// Drains report events into the database.
pub struct Reporter {
    db: Database,
    rx: mpsc::UnboundedReceiver<ReportEvent>,
    shutdown: CancellationToken,
}

impl Reporter {
    pub fn new(
        db: Database,
        rx: mpsc::UnboundedReceiver<ReportEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { db, rx, shutdown }
    }

    pub async fn run(mut self) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    // flush what is already queued
                    while let Ok(event) = self.rx.try_recv() {
                        self.persist(event).await;
                    }
                    tracing::info!(target: "reporter", "Reporter stopped");
                    return Ok(());
                }
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(event) => self.persist(event).await,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn persist(&self, event: ReportEvent) {
        let kind = event.kind();
        if let Err(e) = self.write(event).await {
            tracing::warn!(target: "reporter", kind, error = %e, "Failed to persist report event");
        }
    }

    async fn write(&self, event: ReportEvent) -> Result<(), AppError> {
        match event {
            ReportEvent::Block {
                block_number,
                block_timestamp,
                base_fee,
                gas_used,
                gas_limit,
                new_pools,
            } => {
                self.db
                    .record_block(block_number, block_timestamp, base_fee, gas_used, gas_limit, new_pools)
                    .await
            }
            ReportEvent::PoolDiscovered(pool) => self.db.upsert_pool(&pool).await,
            ReportEvent::Execution(ack) => {
                let id = self.db.record_execution(&ack).await?;
                tracing::debug!(target: "reporter", id, status = %ack.tx_status, "Execution recorded");
                Ok(())
            }
            ReportEvent::PositionOpened {
                pool,
                amount,
                buy_price,
                opened_at,
            } => {
                self.db.upsert_pool(&pool).await?;
                self.db.open_position(&pool, amount, buy_price, opened_at).await?;
                Ok(())
            }
            ReportEvent::PositionClosed {
                pool,
                closed_at,
                realized_pnl_pct,
                reason,
            } => {
                if !self
                    .db
                    .close_position(pool, closed_at, realized_pnl_pct, reason)
                    .await?
                {
                    tracing::warn!(target: "reporter", pool = %pool, "No open position row to close");
                }
                Ok(())
            }
            ReportEvent::CreatorBlacklisted { creator, reason, at } => {
                self.db.add_blacklist(creator, &reason, at).await
            }
        }
    }
}
