// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::retry_async;
use crate::domain::error::AppError;
use crate::domain::types::BlockHeader;
use crate::infrastructure::data::abi::{ERC20, UniswapV2Pair};
use crate::infrastructure::network::provider::{HttpProvider, WsProvider};
use alloy::network::TransactionResponse;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{BlockNumberOrTag, Filter, Header, Log};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::time::{Duration, Instant};

/// Receipt fields the execution path needs.
#[derive(Clone, Debug, PartialEq)]
pub struct TxReceipt {
    pub hash: B256,
    pub success: bool,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, AppError>;

    /// New heads as they arrive; ends when the underlying subscription closes.
    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, BlockHeader>, AppError>;

    async fn latest_block(&self) -> Result<Option<BlockHeader>, AppError>;

    async fn get_logs(
        &self,
        contracts: &[Address],
        topics: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, AppError>;

    /// Raw `(reserve0, reserve1)` of a V2 pair.
    async fn get_reserves(&self, pool: Address) -> Result<(U256, U256), AppError>;

    async fn submit_signed_tx(&self, raw: Bytes) -> Result<B256, AppError>;

    async fn wait_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        poll: Duration,
    ) -> Result<TxReceipt, AppError>;

    async fn transaction_count(&self, account: Address) -> Result<u64, AppError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError>;

    async fn transaction_sender(&self, hash: B256) -> Result<Option<Address>, AppError>;

    async fn balance(&self, account: Address) -> Result<U256, AppError>;
}

pub fn header_from_rpc(header: &Header) -> BlockHeader {
    BlockHeader {
        number: header.inner.number,
        hash: header.hash,
        timestamp: header.inner.timestamp,
        base_fee: u128::from(header.inner.base_fee_per_gas.unwrap_or_default()),
        gas_used: header.inner.gas_used,
        gas_limit: header.inner.gas_limit,
    }
}

/// `ChainClient` over alloy providers; subscriptions need the WS provider.
#[derive(Clone)]
pub struct AlloyChainClient {
    http: HttpProvider,
    ws: Option<WsProvider>,
}

impl AlloyChainClient {
    pub fn new(http: HttpProvider, ws: Option<WsProvider>) -> Self {
        Self { http, ws }
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> Result<u64, AppError> {
        self.http
            .get_chain_id()
            .await
            .map_err(|e| AppError::Connection(format!("chain_id failed: {e}")))
    }

    async fn subscribe_blocks(&self) -> Result<BoxStream<'static, BlockHeader>, AppError> {
        let ws = self
            .ws
            .as_ref()
            .ok_or_else(|| AppError::Connection("no websocket endpoint configured".into()))?;
        let sub = ws
            .subscribe_blocks()
            .await
            .map_err(|e| AppError::Connection(format!("newHeads subscribe failed: {e}")))?;
        Ok(sub
            .into_stream()
            .map(|header| header_from_rpc(&header))
            .boxed())
    }

    async fn latest_block(&self) -> Result<Option<BlockHeader>, AppError> {
        let block = self
            .http
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| AppError::Connection(format!("latest block failed: {e}")))?;
        Ok(block.map(|b| header_from_rpc(&b.header)))
    }

    async fn get_logs(
        &self,
        contracts: &[Address],
        topics: &[B256],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, AppError> {
        if contracts.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::new()
            .address(contracts.to_vec())
            .event_signature(topics.to_vec())
            .from_block(from_block)
            .to_block(to_block);
        let provider = self.http.clone();
        retry_async(
            "get_logs",
            move |_| {
                let provider = provider.clone();
                let filter = filter.clone();
                async move { provider.get_logs(&filter).await }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("get_logs failed: {e}")))
    }

    async fn get_reserves(&self, pool: Address) -> Result<(U256, U256), AppError> {
        let pair = UniswapV2Pair::new(pool, self.http.clone());
        let reserves = retry_async(
            "get_reserves",
            |_| {
                let pair = pair.clone();
                async move { pair.getReserves().call().await }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("getReserves failed for {pool:#x}: {e}")))?;
        Ok((U256::from(reserves.reserve0), U256::from(reserves.reserve1)))
    }

    async fn submit_signed_tx(&self, raw: Bytes) -> Result<B256, AppError> {
        let pending = self
            .http
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| AppError::Transaction {
                hash: String::new(),
                reason: format!("submit failed: {e}"),
            })?;
        Ok(*pending.tx_hash())
    }

    async fn wait_receipt(
        &self,
        hash: B256,
        timeout: Duration,
        poll: Duration,
    ) -> Result<TxReceipt, AppError> {
        let started = Instant::now();
        loop {
            match self.http.get_transaction_receipt(hash).await {
                Ok(Some(rcpt)) => {
                    return Ok(TxReceipt {
                        hash,
                        success: rcpt.status(),
                        block_number: rcpt.block_number.unwrap_or_default(),
                        logs: rcpt.inner.logs().to_vec(),
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        target: "executor",
                        error = %e,
                        hash = %format!("{:#x}", hash),
                        "Receipt lookup error; retrying"
                    );
                }
            }
            if started.elapsed() >= timeout {
                return Err(AppError::Timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn transaction_count(&self, account: Address) -> Result<u64, AppError> {
        let provider = self.http.clone();
        retry_async(
            "transaction_count",
            move |_| {
                let provider = provider.clone();
                async move { provider.get_transaction_count(account).pending().await }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("Failed to fetch nonce: {}", e)))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError> {
        ERC20::new(token, self.http.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| AppError::Connection(format!("allowance failed: {e}")))
    }

    async fn transaction_sender(&self, hash: B256) -> Result<Option<Address>, AppError> {
        let tx = self
            .http
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| AppError::Connection(format!("tx lookup failed: {e}")))?;
        Ok(tx.map(|tx| TransactionResponse::from(&tx)))
    }

    async fn balance(&self, account: Address) -> Result<U256, AppError> {
        self.http
            .get_balance(account)
            .await
            .map_err(|e| AppError::Connection(format!("Balance check failed: {}", e)))
    }
}
