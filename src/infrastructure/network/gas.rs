// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::amm::next_base_fee;
use alloy::primitives::U256;

/// Configured gas envelope for every swap this bot sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPolicy {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub next_base_fee_per_gas: u128,
    pub base_fee_per_gas: u128,
}

impl GasPolicy {
    /// Fees for the block after `(base_fee, gas_used, gas_limit)`, capped by policy.
    pub fn fees_for(&self, base_fee: u128, gas_used: u64, gas_limit: u64) -> GasFees {
        let next_base = next_base_fee(base_fee, gas_used, gas_limit);
        let max_fee = next_base
            .saturating_mul(2)
            .saturating_add(self.max_priority_fee_per_gas)
            .min(self.max_fee_per_gas);
        GasFees {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas.min(max_fee),
            next_base_fee_per_gas: next_base,
            base_fee_per_gas: base_fee,
        }
    }

    /// Fees when no header is available: the configured caps.
    pub fn fallback_fees(&self) -> GasFees {
        GasFees {
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            next_base_fee_per_gas: 0,
            base_fee_per_gas: 0,
        }
    }

    /// Wei reserved for one exit swap: twice the next base fee over the full gas limit.
    pub fn projected_cost(&self, fees: &GasFees) -> U256 {
        U256::from(fees.next_base_fee_per_gas)
            .saturating_mul(U256::from(2u8))
            .saturating_mul(U256::from(self.gas_limit))
    }

    /// The next base fee alone already exceeds our cap.
    pub fn priced_out(&self, fees: &GasFees) -> bool {
        fees.next_base_fee_per_gas > self.max_fee_per_gas
    }
}
