// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use chrono::NaiveDateTime;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct BlockRecord {
    pub block_number: i64,
    pub block_timestamp: i64,
    pub base_fee_wei: String,
    pub gas_used: i64,
    pub gas_limit: i64,
    pub new_pools: i64,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub tx_hash: Option<String>,
    pub pool: String,
    pub is_buy: bool,
    pub status: String,
    pub lead_block: i64,
    pub realized_block: i64,
    pub amount_in: String,
    pub amount_out: String,
    pub account: Option<String>,
    pub reason: Option<String>,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, FromRow)]
pub struct PositionRecord {
    pub id: i64,
    pub pool: String,
    pub token: String,
    pub amount: String,
    pub buy_price: f64,
    pub opened_at: i64,
    pub closed_at: Option<i64>,
    pub realized_pnl_pct: Option<f64>,
    pub close_reason: Option<String>,
}
