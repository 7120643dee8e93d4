// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::types::{CloseReason, ExecutionAck, Pool};
use crate::infrastructure::data::schema::{BlockRecord, PositionRecord, TransactionRecord};
use alloy::primitives::{Address, U256};
use sqlx::{
    Pool as SqlPool, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

#[derive(Clone)]
pub struct Database {
    pool: SqlPool<Sqlite>,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?
            .create_if_missing(true);

        // Every connection to an in-memory database is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Migration failed: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn record_block(
        &self,
        block_number: u64,
        block_timestamp: u64,
        base_fee: u128,
        gas_used: u64,
        gas_limit: u64,
        new_pools: usize,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO blocks (block_number, block_timestamp, base_fee_wei, gas_used, gas_limit, new_pools)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(block_number) DO UPDATE SET
                block_timestamp=excluded.block_timestamp,
                base_fee_wei=excluded.base_fee_wei,
                gas_used=excluded.gas_used,
                gas_limit=excluded.gas_limit,
                new_pools=excluded.new_pools
            "#,
        )
        .bind(block_number as i64)
        .bind(block_timestamp as i64)
        .bind(base_fee.to_string())
        .bind(gas_used as i64)
        .bind(gas_limit as i64)
        .bind(new_pools as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_pool(&self, pool: &Pool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO pools (address, token, token_index, reserve_token, reserve_base, creator, discovered_block, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                reserve_token=excluded.reserve_token,
                reserve_base=excluded.reserve_base,
                creator=COALESCE(excluded.creator, pools.creator)
            "#,
        )
        .bind(format!("{:#x}", pool.address))
        .bind(format!("{:#x}", pool.token))
        .bind(i64::from(pool.token_index))
        .bind(pool.reserve_token.to_string())
        .bind(pool.reserve_base.to_string())
        .bind(pool.creator.map(|c| format!("{:#x}", c)))
        .bind(pool.discovered_block as i64)
        .bind(pool.created_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_execution(&self, ack: &ExecutionAck) -> Result<i64, AppError> {
        let tx_hash = ack.tx_hash.map(|h| format!("{:#x}", h));
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (tx_hash, pool, is_buy, status, lead_block, realized_block, amount_in, amount_out, account, reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(tx_hash.clone())
        .bind(format!("{:#x}", ack.pool.address))
        .bind(ack.is_buy)
        .bind(ack.tx_status.as_str())
        .bind(ack.lead_block as i64)
        .bind(ack.realized_block as i64)
        .bind(ack.amount_in.to_string())
        .bind(ack.amount_out.to_string())
        .bind(ack.account.map(|a| format!("{:#x}", a)))
        .bind(ack.reason.clone())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Transaction {
            hash: tx_hash.unwrap_or_default(),
            reason: e.to_string(),
        })?;
        Ok(row.get("id"))
    }

    pub async fn open_position(
        &self,
        pool: &Pool,
        amount: U256,
        buy_price: f64,
        opened_at: u64,
    ) -> Result<i64, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO positions (pool, token, amount, buy_price, opened_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(format!("{:#x}", pool.address))
        .bind(format!("{:#x}", pool.token))
        .bind(amount.to_string())
        .bind(buy_price)
        .bind(opened_at as i64)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    /// Close the open position on `pool`; returns whether one was found.
    pub async fn close_position(
        &self,
        pool: Address,
        closed_at: u64,
        realized_pnl_pct: f64,
        reason: CloseReason,
    ) -> Result<bool, AppError> {
        let res = sqlx::query(
            r#"
            UPDATE positions
            SET closed_at = ?, realized_pnl_pct = ?, close_reason = ?
            WHERE pool = ? AND closed_at IS NULL
            "#,
        )
        .bind(closed_at as i64)
        .bind(realized_pnl_pct)
        .bind(reason.as_str())
        .bind(format!("{:#x}", pool))
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn add_blacklist(&self, creator: Address, reason: &str, at: u64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO blacklist (creator, reason, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(creator) DO UPDATE SET reason=excluded.reason, created_at=excluded.created_at
            "#,
        )
        .bind(format!("{:#x}", creator))
        .bind(reason)
        .bind(at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether `creator` was blacklisted at or after `since`.
    pub async fn is_blacklisted_since(&self, creator: Address, since: u64) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM blacklist WHERE creator = ? AND created_at >= ?",
        )
        .bind(format!("{:#x}", creator))
        .bind(since as i64)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn open_positions(&self) -> Result<Vec<PositionRecord>, AppError> {
        let rows = sqlx::query_as::<_, PositionRecord>(
            "SELECT * FROM positions WHERE closed_at IS NULL ORDER BY opened_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_transactions(&self, limit: i64) -> Result<Vec<TransactionRecord>, AppError> {
        let rows = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn latest_block(&self) -> Result<Option<BlockRecord>, AppError> {
        let row = sqlx::query_as::<_, BlockRecord>(
            "SELECT * FROM blocks ORDER BY block_number DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
