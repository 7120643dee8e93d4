// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::amm::slippage_bps;
use crate::domain::error::AppError;
use crate::domain::types::{Pool, SimulationResult};
use crate::infrastructure::network::reputation::ReputationOracle;
use crate::services::strategy::simulation::SimulationEngine;
use alloy::primitives::{Address, U256};
use futures::StreamExt;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct InspectorConfig {
    /// Inclusive bounds on the base-asset reserve, in wei.
    pub min_reserve: U256,
    pub max_reserve: U256,
    /// Exclusive bounds on probe slippage.
    pub slippage_min_bps: f64,
    pub slippage_max_bps: f64,
    pub concurrency: usize,
    pub reputation_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InspectionMode {
    /// First look at freshly discovered pools.
    Admission,
    /// Scheduled re-check of a watched pool; activity is counted up to `to_block`.
    Reinspection { to_block: u64 },
}

/// Per-pool verdict of one inspection round.
#[derive(Clone, Debug)]
pub enum Inspection {
    Qualified(SimulationResult),
    Rejected(Address),
    /// A lookup failed transiently; no signal for this pool this round.
    Unavailable(Pool),
}

impl Inspection {
    pub fn address(&self) -> Address {
        match self {
            Inspection::Qualified(result) => result.pool.address,
            Inspection::Rejected(address) => *address,
            Inspection::Unavailable(pool) => pool.address,
        }
    }

    pub fn into_qualified(self) -> Option<SimulationResult> {
        match self {
            Inspection::Qualified(result) => Some(result),
            _ => None,
        }
    }
}

/// Filters candidate pools down to the ones worth holding. Pure over its inputs; the
/// caller owns any state the results feed into.
pub struct Inspector {
    config: InspectorConfig,
    simulator: Arc<dyn SimulationEngine>,
    reputation: Option<Arc<dyn ReputationOracle>>,
}

impl Inspector {
    pub fn new(
        config: InspectorConfig,
        simulator: Arc<dyn SimulationEngine>,
        reputation: Option<Arc<dyn ReputationOracle>>,
    ) -> Self {
        let reputation = reputation.filter(|_| config.reputation_enabled);
        Self {
            config,
            simulator,
            reputation,
        }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// One verdict per input pool, in no particular order. Transient RPC failures come back
    /// as `Unavailable` so the caller can retry instead of discarding the pool.
    pub async fn evaluate(
        &self,
        pools: &[Pool],
        probe_amount: U256,
        mode: InspectionMode,
    ) -> Vec<Inspection> {
        let mut verdicts = Vec::with_capacity(pools.len());
        let mut candidates = Vec::new();
        for pool in pools {
            if self.reserve_in_range(pool) {
                candidates.push(pool.clone());
            } else {
                verdicts.push(Inspection::Rejected(pool.address));
            }
        }
        if candidates.is_empty() {
            return verdicts;
        }

        let inspected = futures::stream::iter(candidates)
            .map(|pool| async move { self.inspect_one(pool, probe_amount, mode).await })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        verdicts.extend(inspected);
        verdicts
    }

    fn reserve_in_range(&self, pool: &Pool) -> bool {
        let ok = pool.reserve_base >= self.config.min_reserve
            && pool.reserve_base <= self.config.max_reserve;
        if !ok {
            tracing::debug!(
                target: "inspector",
                pool = %pool.address,
                reserve_base = %pool.reserve_base,
                "Reserve outside range"
            );
        }
        ok
    }

    async fn inspect_one(&self, mut pool: Pool, probe_amount: U256, mode: InspectionMode) -> Inspection {
        let address = pool.address;
        if let Some(oracle) = &self.reputation {
            match self.passes_reputation(oracle.as_ref(), &mut pool, mode).await {
                Ok(true) => {}
                Ok(false) => return Inspection::Rejected(address),
                Err(e) if e.is_transient() => {
                    tracing::debug!(target: "inspector", pool = %address, error = %e, "Reputation lookup unavailable; retrying next cycle");
                    return Inspection::Unavailable(pool);
                }
                Err(e) => {
                    tracing::warn!(target: "inspector", pool = %address, error = %e, "Reputation check failed");
                    return Inspection::Rejected(address);
                }
            }
        }

        let probe = match self.simulator.probe(&pool, probe_amount).await {
            Ok(probe) => probe,
            Err(e) if e.is_transient() => {
                tracing::debug!(target: "inspector", pool = %address, error = %e, "Probe unavailable; retrying next cycle");
                return Inspection::Unavailable(pool);
            }
            Err(e) => {
                tracing::debug!(target: "inspector", pool = %address, error = %e, "Probe failed");
                return Inspection::Rejected(address);
            }
        };
        let slippage = slippage_bps(probe.amount_in, probe.amount_out);
        if !(slippage > self.config.slippage_min_bps && slippage < self.config.slippage_max_bps) {
            tracing::debug!(
                target: "inspector",
                pool = %address,
                slippage_bps = slippage,
                "Slippage outside window"
            );
            return Inspection::Rejected(address);
        }
        tracing::debug!(target: "inspector", pool = %address, slippage_bps = slippage, "Pool qualifies");
        Inspection::Qualified(SimulationResult {
            pool,
            amount_in: probe.amount_in,
            amount_out: probe.amount_out,
            slippage_bps: slippage,
        })
    }

    async fn passes_reputation(
        &self,
        oracle: &dyn ReputationOracle,
        pool: &mut Pool,
        mode: InspectionMode,
    ) -> Result<bool, AppError> {
        if let Some(creator) = pool.creator
            && oracle.is_blacklisted(creator).await?
        {
            tracing::info!(target: "inspector", pool = %pool.address, creator = %creator, "Creator is blacklisted");
            return Ok(false);
        }

        if !pool.verified {
            if !oracle.is_verified(pool.token).await? {
                tracing::debug!(target: "inspector", pool = %pool.address, token = %pool.token, "Token source not verified");
                return Ok(false);
            }
            pool.verified = true;
        }

        if let InspectionMode::Reinspection { to_block } = mode {
            let from_block = pool.last_inspected_block.saturating_add(1);
            let suspicious = oracle
                .count_suspicious_activity(pool, from_block, to_block)
                .await?;
            if suspicious > 0 {
                tracing::info!(
                    target: "inspector",
                    pool = %pool.address,
                    suspicious,
                    "Creator touched the token since last inspection"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
