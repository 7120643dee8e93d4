// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! In-memory collaborators shared by the unit and integration tests.

use crate::domain::error::AppError;
use crate::domain::types::{BlockHeader, Pool, ReportEvent};
use crate::infrastructure::network::chain::{ChainClient, TxReceipt};
use crate::infrastructure::network::reputation::ReputationOracle;
use crate::services::reporter::ReportSink;
use crate::services::strategy::simulation::{ProbeResult, SimulationEngine};
use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn header(number: u64, timestamp: u64) -> BlockHeader {
    BlockHeader {
        number,
        hash: B256::from(U256::from(number)),
        timestamp,
        base_fee: 0,
        gas_used: 0,
        gas_limit: 30_000_000,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReceiptOutcome {
    #[default]
    Success,
    Revert,
    Timeout,
}

#[derive(Default)]
pub struct MockChain {
    nonce: Mutex<u64>,
    heads: Mutex<Vec<BlockHeader>>,
    latest: Mutex<Option<BlockHeader>>,
    logs: Mutex<Vec<Log>>,
    reserves: Mutex<HashMap<Address, (U256, U256)>>,
    senders: Mutex<HashMap<B256, Address>>,
    submitted: Mutex<Vec<Bytes>>,
    receipt_logs: Mutex<Vec<Log>>,
    receipt_outcome: Mutex<ReceiptOutcome>,
    allowance: Mutex<U256>,
    balance: Mutex<U256>,
    fail_subscribe: AtomicBool,
    fail_poll: AtomicBool,
    fail_submit: AtomicBool,
    nonce_reads: AtomicUsize,
}

impl MockChain {
    pub fn set_nonce(&self, nonce: u64) {
        *guard(&self.nonce) = nonce;
    }

    pub fn nonce_reads(&self) -> usize {
        self.nonce_reads.load(Ordering::SeqCst)
    }

    pub fn set_heads(&self, heads: Vec<BlockHeader>) {
        *guard(&self.heads) = heads;
    }

    pub fn set_latest(&self, header: BlockHeader) {
        *guard(&self.latest) = Some(header);
    }

    pub fn push_log(&self, log: Log) {
        guard(&self.logs).push(log);
    }

    pub fn set_reserves(&self, pool: Address, reserve0: U256, reserve1: U256) {
        guard(&self.reserves).insert(pool, (reserve0, reserve1));
    }

    pub fn set_sender(&self, tx: B256, sender: Address) {
        guard(&self.senders).insert(tx, sender);
    }

    pub fn set_receipt_logs(&self, logs: Vec<Log>) {
        *guard(&self.receipt_logs) = logs;
    }

    pub fn set_receipt_outcome(&self, outcome: ReceiptOutcome) {
        *guard(&self.receipt_outcome) = outcome;
    }

    pub fn set_allowance(&self, allowance: U256) {
        *guard(&self.allowance) = allowance;
    }

    pub fn set_balance(&self, balance: U256) {
        *guard(&self.balance) = balance;
    }

    pub fn fail_subscriptions(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn fail_polling(&self) {
        self.fail_poll.store(true, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<Bytes> {
        guard(&self.submitted).clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64, AppError> {
        Ok(8453)
    }

    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, BlockHeader>, AppError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AppError::Connection("subscribe refused".into()));
        }
        let heads = guard(&self.heads).clone();
        Ok(futures::stream::iter(heads).boxed())
    }

    async fn latest_block(&self) -> Result<Option<BlockHeader>, AppError> {
        if self.fail_poll.load(Ordering::SeqCst) {
            return Err(AppError::Connection("poll refused".into()));
        }
        Ok(guard(&self.latest).clone())
    }

    async fn get_logs(
        &self,
        contracts: &[Address],
        topics: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, AppError> {
        let logs = guard(&self.logs);
        Ok(logs
            .iter()
            .filter(|log| contracts.contains(&log.address()))
            .filter(|log| log.topic0().is_some_and(|t| topics.contains(t)))
            .filter(|log| {
                log.block_number
                    .is_some_and(|b| b >= from_block && b <= to_block)
            })
            .cloned()
            .collect())
    }

    async fn get_reserves(&self, pool: Address) -> Result<(U256, U256), AppError> {
        guard(&self.reserves)
            .get(&pool)
            .copied()
            .ok_or_else(|| AppError::Connection(format!("no reserves for {pool:#x}")))
    }

    async fn submit_signed_tx(&self, raw: Bytes) -> Result<B256, AppError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(AppError::Transaction {
                hash: String::new(),
                reason: "nonce too low".into(),
            });
        }
        let hash = keccak256(&raw);
        guard(&self.submitted).push(raw);
        Ok(hash)
    }

    async fn wait_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        _poll: Duration,
    ) -> Result<TxReceipt, AppError> {
        let outcome = *guard(&self.receipt_outcome);
        let block_number = guard(&self.latest).as_ref().map_or(1, |h| h.number + 1);
        match outcome {
            ReceiptOutcome::Timeout => Err(AppError::Timeout(timeout.as_millis() as u64)),
            ReceiptOutcome::Revert => Ok(TxReceipt {
                hash,
                success: false,
                block_number,
                logs: Vec::new(),
            }),
            ReceiptOutcome::Success => Ok(TxReceipt {
                hash,
                success: true,
                block_number,
                logs: guard(&self.receipt_logs).clone(),
            }),
        }
    }

    async fn transaction_count(&self, _account: Address) -> Result<u64, AppError> {
        self.nonce_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*guard(&self.nonce))
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, AppError> {
        Ok(*guard(&self.allowance))
    }

    async fn transaction_sender(&self, hash: B256) -> Result<Option<Address>, AppError> {
        Ok(guard(&self.senders).get(&hash).copied())
    }

    async fn balance(&self, _account: Address) -> Result<U256, AppError> {
        Ok(*guard(&self.balance))
    }
}

/// Probe outcomes keyed by pool address; unknown pools revert.
#[derive(Default)]
pub struct StaticSimulator {
    slippage: Mutex<HashMap<Address, u64>>,
    unavailable: Mutex<HashSet<Address>>,
    calls: AtomicUsize,
}

impl StaticSimulator {
    pub fn set_slippage(&self, pool: Address, bps: u64) {
        guard(&self.unavailable).remove(&pool);
        guard(&self.slippage).insert(pool, bps);
    }

    pub fn revert(&self, pool: Address) {
        guard(&self.slippage).remove(&pool);
    }

    /// Probes of `pool` fail with a connection error until its slippage is set again.
    pub fn set_unavailable(&self, pool: Address) {
        guard(&self.unavailable).insert(pool);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimulationEngine for StaticSimulator {
    async fn probe(&self, pool: &Pool, amount_in: U256) -> Result<ProbeResult, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if guard(&self.unavailable).contains(&pool.address) {
            return Err(AppError::Connection("node unavailable".into()));
        }
        let bps = guard(&self.slippage)
            .get(&pool.address)
            .copied()
            .ok_or_else(|| AppError::Simulation {
                pool: format!("{:#x}", pool.address),
                reason: "execution reverted".into(),
            })?;
        let amount_out = amount_in * U256::from(10_000 - bps.min(10_000)) / U256::from(10_000u64);
        Ok(ProbeResult {
            amount_in,
            amount_out,
        })
    }
}

#[derive(Default)]
pub struct StaticReputation {
    blacklisted: Mutex<HashSet<Address>>,
    unverified: Mutex<HashSet<Address>>,
    suspicious: Mutex<HashMap<Address, u64>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StaticReputation {
    /// While offline every lookup fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lookup(&self) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Connection("explorer unavailable".into()));
        }
        Ok(())
    }

    pub fn blacklist(&self, creator: Address) {
        guard(&self.blacklisted).insert(creator);
    }

    pub fn unverify(&self, token: Address) {
        guard(&self.unverified).insert(token);
    }

    pub fn set_suspicious(&self, pool: Address, count: u64) {
        guard(&self.suspicious).insert(pool, count);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationOracle for StaticReputation {
    async fn is_blacklisted(&self, creator: Address) -> Result<bool, AppError> {
        self.lookup()?;
        Ok(guard(&self.blacklisted).contains(&creator))
    }

    async fn is_verified(&self, token: Address) -> Result<bool, AppError> {
        self.lookup()?;
        Ok(!guard(&self.unverified).contains(&token))
    }

    async fn count_suspicious_activity(
        &self,
        pool: &Pool,
        _from_block: u64,
        _to_block: u64,
    ) -> Result<u64, AppError> {
        self.lookup()?;
        Ok(guard(&self.suspicious)
            .get(&pool.address)
            .copied()
            .unwrap_or(0))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ReportEvent> {
        guard(&self.events).clone()
    }
}

impl ReportSink for RecordingSink {
    fn enqueue(&self, event: ReportEvent) {
        guard(&self.events).push(event);
    }
}
