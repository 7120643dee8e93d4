// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::retry::with_timeout;
use crate::common::time_utils::current_unix;
use crate::domain::amm::wei_to_ether;
use crate::domain::constants::APPROVE_GAS_LIMIT;
use crate::domain::error::AppError;
use crate::domain::types::{ExecutionAck, ExecutionOrder};
use crate::infrastructure::data::abi::{ERC20, UniV2Router, realized_amount_out};
use crate::infrastructure::network::chain::{ChainClient, TxReceipt};
use crate::infrastructure::network::gas::{GasFees, GasPolicy};
use crate::infrastructure::network::nonce::NonceManager;
use crate::services::signer::{SignerPool, UnsignedCall};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolCall;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub chain_id: u64,
    pub router: Address,
    pub weth: Address,
    pub deadline_delay_secs: u64,
    pub receipt_timeout: Duration,
    pub receipt_poll: Duration,
    pub gas: GasPolicy,
    /// Sign nothing; every order is acked FAILED.
    pub dry_run: bool,
}

/// Why an order did not land; carries the hash once something was broadcast.
#[derive(Debug)]
struct Failure {
    hash: Option<B256>,
    reason: String,
}

impl Failure {
    fn before_submit(err: impl std::fmt::Display) -> Self {
        Self {
            hash: None,
            reason: err.to_string(),
        }
    }

    fn after_submit(hash: B256, err: impl std::fmt::Display) -> Self {
        Self {
            hash: Some(hash),
            reason: err.to_string(),
        }
    }
}

/// Turns orders into signed swaps. One worker per execution account, each running a
/// single order at a time; every order yields exactly one ack.
pub struct ExecutionGateway {
    chain: Arc<dyn ChainClient>,
    signers: SignerPool,
    config: GatewayConfig,
}

impl ExecutionGateway {
    pub fn new(chain: Arc<dyn ChainClient>, signers: SignerPool, config: GatewayConfig) -> Self {
        Self {
            chain,
            signers,
            config,
        }
    }

    /// Log every account's balance and return those that cannot cover a buy plus gas.
    pub async fn preflight(&self, buy_amount: U256) -> Vec<Address> {
        let gas_budget = U256::from(self.config.gas.max_fee_per_gas)
            .saturating_mul(U256::from(self.config.gas.gas_limit));
        let needed = buy_amount.saturating_add(gas_budget);
        let mut underfunded = Vec::new();
        for address in self.signers.addresses() {
            match self.chain.balance(address).await {
                Ok(balance) if balance < needed => {
                    tracing::warn!(
                        target: "executor",
                        account = %address,
                        balance_eth = wei_to_ether(balance),
                        needed_eth = wei_to_ether(needed),
                        "Execution account underfunded"
                    );
                    underfunded.push(address);
                }
                Ok(balance) => tracing::info!(
                    target: "executor",
                    account = %address,
                    balance_eth = wei_to_ether(balance),
                    "Execution account ready"
                ),
                Err(e) => tracing::warn!(target: "executor", account = %address, error = %e, "Balance check failed"),
            }
        }
        underfunded
    }

    pub async fn run(
        self,
        mut orders: mpsc::UnboundedReceiver<ExecutionOrder>,
        acks: mpsc::UnboundedSender<ExecutionAck>,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        let mut lanes = Vec::with_capacity(self.signers.len());
        let mut handles = Vec::with_capacity(self.signers.len());
        for index in 0..self.signers.len() {
            let worker = self.worker(index)?;
            let (tx, rx) = mpsc::unbounded_channel();
            lanes.push(tx);
            handles.push(tokio::spawn(worker.run(rx, acks.clone())));
        }
        tracing::info!(
            target: "executor",
            accounts = lanes.len(),
            dry_run = self.config.dry_run,
            "Execution gateway started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                maybe_order = orders.recv() => {
                    let Some(order) = maybe_order else { break };
                    let index = order
                        .account
                        .and_then(|a| self.signers.index_of(a))
                        .unwrap_or_else(|| self.signers.next_index());
                    if let Err(mpsc::error::SendError(order)) = lanes[index].send(order) {
                        tracing::error!(target: "executor", account = index, "Execution worker gone");
                        let _ = acks.send(ExecutionAck::failed(&order, None, None, "execution worker unavailable"));
                    }
                }
            }
        }

        // in-flight orders run to completion
        drop(lanes);
        for res in join_all(handles).await {
            if let Err(e) = res {
                tracing::error!(target: "executor", error = %e, "Execution worker panicked");
            }
        }
        tracing::info!(target: "executor", "Execution gateway stopped");
        Ok(())
    }

    fn worker(&self, index: usize) -> Result<AccountWorker, AppError> {
        let address = self
            .signers
            .address(index)
            .ok_or_else(|| AppError::Initialization(format!("missing execution account #{index}")))?;
        Ok(AccountWorker {
            index,
            address,
            chain: self.chain.clone(),
            signers: self.signers.clone(),
            nonces: NonceManager::new(self.chain.clone(), address),
            config: self.config.clone(),
        })
    }
}

pub struct AccountWorker {
    index: usize,
    address: Address,
    chain: Arc<dyn ChainClient>,
    signers: SignerPool,
    nonces: NonceManager,
    config: GatewayConfig,
}

impl AccountWorker {
    async fn run(
        self,
        mut orders: mpsc::UnboundedReceiver<ExecutionOrder>,
        acks: mpsc::UnboundedSender<ExecutionAck>,
    ) {
        while let Some(order) = orders.recv().await {
            let ack = self.execute(order).await;
            if acks.send(ack).is_err() {
                tracing::warn!(target: "executor", account = %self.address, "Ack consumer gone");
            }
        }
    }

    pub async fn execute(&self, order: ExecutionOrder) -> ExecutionAck {
        if self.config.dry_run {
            tracing::info!(
                target: "executor",
                pool = %order.pool.address,
                side = order.side(),
                amount_in = %order.amount_in,
                "Dry run; order not sent"
            );
            return ExecutionAck::failed(&order, None, Some(self.address), "dry-run");
        }

        match self.try_execute(&order).await {
            Ok(ack) => ack,
            Err(failure) => {
                self.nonces.invalidate();
                tracing::warn!(
                    target: "executor",
                    account = %self.address,
                    pool = %order.pool.address,
                    side = order.side(),
                    hash = ?failure.hash,
                    reason = %failure.reason,
                    "Order failed"
                );
                ExecutionAck::failed(&order, failure.hash, Some(self.address), failure.reason)
            }
        }
    }

    async fn try_execute(&self, order: &ExecutionOrder) -> Result<ExecutionAck, Failure> {
        let fees = self.current_fees().await;
        if self.config.gas.priced_out(&fees) {
            return Err(Failure::before_submit(format!(
                "next base fee {} above cap {}",
                fees.next_base_fee_per_gas, self.config.gas.max_fee_per_gas
            )));
        }
        let deadline = U256::from(order.deadline(self.config.deadline_delay_secs, current_unix()));
        let token = order.pool.token;

        let (value, input) = if order.is_buy {
            let call = UniV2Router::swapExactETHForTokensCall {
                amountOutMin: order.amount_out_min,
                path: vec![self.config.weth, token],
                to: self.address,
                deadline,
            };
            (order.amount_in, call.abi_encode())
        } else {
            self.ensure_allowance(token, order.amount_in, &fees).await?;
            let call = UniV2Router::swapExactTokensForETHCall {
                amountIn: order.amount_in,
                amountOutMin: order.amount_out_min,
                path: vec![token, self.config.weth],
                to: self.address,
                deadline,
            };
            (U256::ZERO, call.abi_encode())
        };

        let receipt = self
            .send_and_wait(self.config.router, value, input.into(), self.config.gas.gas_limit, &fees)
            .await?;
        let amount_out = realized_amount_out(
            &receipt.logs,
            order.pool.address,
            order.pool.token_index,
            order.is_buy,
        )
        .unwrap_or_else(|| {
            tracing::warn!(
                target: "executor",
                hash = %receipt.hash,
                pool = %order.pool.address,
                "No Swap log in receipt; using minimum output"
            );
            order.amount_out_min
        });
        tracing::info!(
            target: "executor",
            account = %self.address,
            pool = %order.pool.address,
            side = order.side(),
            hash = %receipt.hash,
            block = receipt.block_number,
            amount_out = %amount_out,
            "Order confirmed"
        );
        Ok(ExecutionAck::success(
            order,
            receipt.hash,
            receipt.block_number,
            amount_out,
            self.address,
        ))
    }

    async fn ensure_allowance(&self, token: Address, amount: U256, fees: &GasFees) -> Result<(), Failure> {
        let allowance = self
            .chain
            .allowance(token, self.address, self.config.router)
            .await
            .map_err(Failure::before_submit)?;
        if allowance >= amount {
            return Ok(());
        }
        tracing::info!(target: "executor", account = %self.address, token = %token, "Approving router");
        let call = ERC20::approveCall {
            spender: self.config.router,
            amount: U256::MAX,
        };
        self.send_and_wait(token, U256::ZERO, call.abi_encode().into(), APPROVE_GAS_LIMIT, fees)
            .await
            .map_err(|f| Failure {
                hash: f.hash,
                reason: format!("approve failed: {}", f.reason),
            })?;
        Ok(())
    }

    async fn send_and_wait(
        &self,
        to: Address,
        value: U256,
        input: Bytes,
        gas_limit: u64,
        fees: &GasFees,
    ) -> Result<TxReceipt, Failure> {
        let limit = self.config.receipt_timeout;
        let nonce = with_timeout(limit, self.nonces.reserve())
            .await
            .map_err(Failure::before_submit)?;
        let signed = self
            .signers
            .sign(
                self.index,
                &UnsignedCall {
                    to,
                    value,
                    input,
                    gas_limit,
                    nonce,
                    fees: *fees,
                },
            )
            .map_err(Failure::before_submit)?;
        with_timeout(limit, self.chain.submit_signed_tx(signed.raw))
            .await
            .map_err(Failure::before_submit)?;
        tracing::debug!(target: "executor", account = %self.address, nonce, hash = %signed.hash, "Submitted");

        let receipt = self
            .chain
            .wait_receipt(signed.hash, self.config.receipt_timeout, self.config.receipt_poll)
            .await
            .map_err(|e| Failure::after_submit(signed.hash, e))?;
        if !receipt.success {
            return Err(Failure::after_submit(signed.hash, "reverted"));
        }
        Ok(receipt)
    }

    async fn current_fees(&self) -> GasFees {
        match self.chain.latest_block().await {
            Ok(Some(h)) => self.config.gas.fees_for(h.base_fee, h.gas_used, h.gas_limit),
            Ok(None) => self.config.gas.fallback_fees(),
            Err(e) => {
                tracing::debug!(target: "executor", error = %e, "Header fetch failed; using fee caps");
                self.config.gas.fallback_fees()
            }
        }
    }
}
