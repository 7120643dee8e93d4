// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::PROBE_BALANCE_WEI;
use crate::domain::error::AppError;
use crate::domain::types::Pool;
use crate::infrastructure::data::abi::InspectorBot;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::{Address, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::state::StateOverridesBuilder;
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

/// Round-trip result of a probe trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub amount_in: U256,
    pub amount_out: U256,
}

#[async_trait]
pub trait SimulationEngine: Send + Sync {
    /// Buy `pool.token` with `amount_in` of the base asset and sell it straight back.
    async fn probe(&self, pool: &Pool, amount_in: U256) -> Result<ProbeResult, AppError>;
}

/// Probes through `eth_call` against the inspector contract with an overridden caller balance,
/// so nothing is spent and nothing is signed.
#[derive(Clone)]
pub struct EthCallSimulator {
    provider: HttpProvider,
    bot: Address,
    caller: Address,
}

impl EthCallSimulator {
    pub fn new(provider: HttpProvider, bot: Address, caller: Address) -> Self {
        Self {
            provider,
            bot,
            caller,
        }
    }

    fn request(&self, pool: &Pool, amount_in: U256) -> TransactionRequest {
        let calldata = InspectorBot::inspectCall { token: pool.token }.abi_encode();
        TransactionRequest {
            from: Some(self.caller),
            to: Some(TxKind::Call(self.bot)),
            value: Some(amount_in),
            input: TransactionInput::new(calldata.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SimulationEngine for EthCallSimulator {
    async fn probe(&self, pool: &Pool, amount_in: U256) -> Result<ProbeResult, AppError> {
        let overrides = StateOverridesBuilder::default()
            .with_balance(self.caller, U256::from(PROBE_BALANCE_WEI))
            .build();
        let raw = self
            .provider
            .call(self.request(pool, amount_in))
            .overrides(overrides)
            .await
            .map_err(|e| {
                // a JSON-RPC error body is the node's verdict; anything else never reached it
                if e.as_error_resp().is_some() {
                    AppError::Simulation {
                        pool: format!("{:#x}", pool.address),
                        reason: format!("eth_call failed: {e}"),
                    }
                } else {
                    AppError::Connection(format!("eth_call transport: {e}"))
                }
            })?;
        let decoded = InspectorBot::inspectCall::abi_decode_returns(&raw).map_err(|e| {
            AppError::Simulation {
                pool: format!("{:#x}", pool.address),
                reason: format!("decode failed: {e}"),
            }
        })?;
        Ok(ProbeResult {
            amount_in: decoded.amountIn,
            amount_out: decoded.amountOut,
        })
    }
}
