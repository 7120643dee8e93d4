// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::amm::ether_to_wei;
use crate::domain::constants::{
    BASESCAN_API_URL, DEFAULT_GAS_LIMIT, UNISWAP_V2_FACTORY_BASE, UNISWAP_V2_ROUTER_BASE,
    WEI_PER_GWEI, WETH_BASE,
};
use crate::domain::error::AppError;
use crate::infrastructure::network::block_feed::FeedConfig;
use crate::infrastructure::network::gas::GasPolicy;
use crate::infrastructure::network::reputation::ReputationConfig;
use crate::services::strategy::execution::gateway::GatewayConfig;
use crate::services::strategy::inspector::InspectorConfig;
use crate::services::strategy::strategy::StrategyConfig;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    pub database_url: Option<String>,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    // Chain access
    #[serde(default = "default_http_provider")]
    pub http_provider: String,
    pub websocket_provider: Option<String>,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    // Contracts
    #[serde(default = "default_factory")]
    pub factory_address: Address,
    #[serde(default = "default_router")]
    pub router_address: Address,
    #[serde(default = "default_weth")]
    pub weth_address: Address,
    pub probe_bot_address: Option<Address>,

    // Identity
    /// Comma-separated private keys, one per execution account.
    pub execution_keys: String,

    // Transaction
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_max_fee_gwei")]
    pub max_fee_per_gas_gwei: u64,
    #[serde(default = "default_max_priority_fee_gwei")]
    pub max_priority_fee_per_gas_gwei: u64,
    #[serde(default = "default_deadline_delay")]
    pub deadline_delay_seconds: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    /// Minimum-out tolerance applied to every swap.
    #[serde(default = "default_order_slippage_bps")]
    pub order_slippage_bps: u64,

    // Inspection
    #[serde(default = "default_reserve_min")]
    pub reserve_min_threshold: f64,
    #[serde(default = "default_reserve_max")]
    pub reserve_max_threshold: f64,
    #[serde(default = "default_slippage_min_bps")]
    pub slippage_min_threshold_bps: f64,
    #[serde(default = "default_slippage_max_bps")]
    pub slippage_max_threshold_bps: f64,
    #[serde(default = "default_probe_amount")]
    pub probe_amount: f64,
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    #[serde(default = "default_watchlist_capacity")]
    pub watchlist_capacity: usize,
    #[serde(default = "default_max_inspect_attempts")]
    pub max_inspect_attempts: u32,
    #[serde(default = "default_inspect_interval")]
    pub inspect_interval_seconds: u64,

    // Trading
    #[serde(default = "default_buy_amount")]
    pub buy_amount: f64,
    #[serde(default = "default_take_profit")]
    pub take_profit_pct: f64,
    #[serde(default = "default_stop_loss")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_hold_max_duration")]
    pub hold_max_duration_seconds: u64,
    #[serde(default = "default_hard_stop")]
    pub hard_stop_pnl_threshold: f64,
    #[serde(default = "default_max_liquidation_attempts")]
    pub max_liquidation_attempts: u32,
    #[serde(default = "default_failed_sell_penalty")]
    pub failed_sell_pnl_penalty_pct: f64,

    // Reputation
    #[serde(default = "default_true")]
    pub reputation_enabled: bool,
    pub etherscan_api_key: Option<String>,
    #[serde(default = "default_etherscan_api_url")]
    pub etherscan_api_url: String,
    #[serde(default = "default_blacklist_window_days")]
    pub blacklist_window_days: u64,
}

// Defaults
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_metrics_port() -> u16 {
    9000
}
fn default_http_provider() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    30
}
fn default_factory() -> Address {
    UNISWAP_V2_FACTORY_BASE
}
fn default_router() -> Address {
    UNISWAP_V2_ROUTER_BASE
}
fn default_weth() -> Address {
    WETH_BASE
}
fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}
fn default_max_fee_gwei() -> u64 {
    50
}
fn default_max_priority_fee_gwei() -> u64 {
    2
}
fn default_deadline_delay() -> u64 {
    30
}
fn default_receipt_timeout_ms() -> u64 {
    60_000
}
fn default_receipt_poll_ms() -> u64 {
    500
}
fn default_order_slippage_bps() -> u64 {
    1_000
}
fn default_reserve_min() -> f64 {
    1.0
}
fn default_reserve_max() -> f64 {
    50.0
}
fn default_slippage_min_bps() -> f64 {
    30.0
}
fn default_slippage_max_bps() -> f64 {
    100.0
}
fn default_probe_amount() -> f64 {
    0.001
}
fn default_probe_concurrency() -> usize {
    5
}
fn default_watchlist_capacity() -> usize {
    20
}
fn default_max_inspect_attempts() -> u32 {
    3
}
fn default_inspect_interval() -> u64 {
    300
}
fn default_buy_amount() -> f64 {
    0.01
}
fn default_take_profit() -> f64 {
    30.0
}
fn default_stop_loss() -> f64 {
    -20.0
}
fn default_hold_max_duration() -> u64 {
    3_600
}
fn default_hard_stop() -> f64 {
    -199.0
}
fn default_max_liquidation_attempts() -> u32 {
    3
}
fn default_failed_sell_penalty() -> f64 {
    -100.0
}
fn default_etherscan_api_url() -> String {
    BASESCAN_API_URL.to_string()
}
fn default_blacklist_window_days() -> u64 {
    30
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::default());

        let settings: GlobalSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.execution_keys.trim().is_empty() {
            return Err(AppError::Config("EXECUTION_KEYS is missing".to_string()));
        }
        if self.reserve_min_threshold >= self.reserve_max_threshold {
            return Err(invalid(
                "reserve_min_threshold",
                "must be lower than reserve_max_threshold",
            ));
        }
        if self.slippage_min_threshold_bps >= self.slippage_max_threshold_bps {
            return Err(invalid(
                "slippage_min_threshold_bps",
                "must be lower than slippage_max_threshold_bps",
            ));
        }
        if self.watchlist_capacity == 0 {
            return Err(invalid("watchlist_capacity", "must be at least 1"));
        }
        if self.max_inspect_attempts == 0 {
            return Err(invalid("max_inspect_attempts", "must be at least 1"));
        }
        if self.stop_loss_pct >= self.take_profit_pct {
            return Err(invalid("stop_loss_pct", "must be lower than take_profit_pct"));
        }
        if self.buy_amount <= 0.0 || self.probe_amount <= 0.0 {
            return Err(invalid("buy_amount", "buy and probe amounts must be positive"));
        }
        for (name, address) in [
            ("FACTORY_ADDRESS", self.factory_address),
            ("ROUTER_ADDRESS", self.router_address),
            ("WETH_ADDRESS", self.weth_address),
        ] {
            if address.is_zero() {
                return Err(AppError::InvalidAddress(format!("{name}={address}")));
            }
        }
        Ok(())
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| "sqlite://sniper.db".to_string())
    }

    pub fn websocket_provider_value(&self) -> Option<String> {
        self.websocket_provider
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn etherscan_api_key_value(&self) -> Option<String> {
        self.etherscan_api_key
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn signers(&self) -> Result<Vec<PrivateKeySigner>, AppError> {
        let signers = self
            .execution_keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .enumerate()
            .map(|(idx, key)| {
                PrivateKeySigner::from_str(key).map_err(|e| {
                    AppError::Config(format!("Invalid execution key #{}: {}", idx + 1, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if signers.is_empty() {
            return Err(AppError::Config("EXECUTION_KEYS holds no keys".to_string()));
        }
        Ok(signers)
    }

    pub fn receipt_poll_ms_value(&self) -> u64 {
        self.receipt_poll_ms.max(100)
    }

    pub fn receipt_timeout_ms_value(&self) -> u64 {
        self.receipt_timeout_ms.max(self.receipt_poll_ms_value())
    }

    pub fn gas_policy(&self) -> GasPolicy {
        let max_fee = u128::from(self.max_fee_per_gas_gwei.max(1)) * WEI_PER_GWEI;
        let priority = u128::from(self.max_priority_fee_per_gas_gwei) * WEI_PER_GWEI;
        GasPolicy {
            gas_limit: self.gas_limit.max(21_000),
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority.min(max_fee),
        }
    }

    pub fn inspector_config(&self, reputation_enabled: bool) -> InspectorConfig {
        InspectorConfig {
            min_reserve: ether_to_wei(self.reserve_min_threshold),
            max_reserve: ether_to_wei(self.reserve_max_threshold),
            slippage_min_bps: self.slippage_min_threshold_bps,
            slippage_max_bps: self.slippage_max_threshold_bps,
            concurrency: self.probe_concurrency.max(1),
            reputation_enabled: reputation_enabled && self.reputation_enabled,
        }
    }

    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            watchlist_capacity: self.watchlist_capacity,
            max_inspect_attempts: self.max_inspect_attempts,
            inspect_interval_secs: self.inspect_interval_seconds,
            probe_amount: ether_to_wei(self.probe_amount),
            buy_amount: ether_to_wei(self.buy_amount),
            order_slippage_bps: self.order_slippage_bps,
            take_profit_pct: self.take_profit_pct,
            stop_loss_pct: self.stop_loss_pct,
            hold_max_duration_secs: self.hold_max_duration_seconds,
            hard_stop_pnl_threshold: self.hard_stop_pnl_threshold,
            max_liquidation_attempts: self.max_liquidation_attempts.max(1),
            failed_sell_pnl_penalty_pct: self.failed_sell_pnl_penalty_pct,
            gas: self.gas_policy(),
        }
    }

    pub fn gateway_config(&self, chain_id: u64, dry_run: bool) -> GatewayConfig {
        GatewayConfig {
            chain_id,
            router: self.router_address,
            weth: self.weth_address,
            deadline_delay_secs: self.deadline_delay_seconds,
            receipt_timeout: Duration::from_millis(self.receipt_timeout_ms_value()),
            receipt_poll: Duration::from_millis(self.receipt_poll_ms_value()),
            gas: self.gas_policy(),
            dry_run,
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            factory: self.factory_address,
            weth: self.weth_address,
            max_reconnect_attempts: self.max_reconnect_attempts.max(1),
            ..FeedConfig::default()
        }
    }

    pub fn reputation_config(&self) -> ReputationConfig {
        ReputationConfig {
            api_url: self.etherscan_api_url.clone(),
            api_key: self.etherscan_api_key_value(),
            blacklist_window_secs: self.blacklist_window_days.saturating_mul(86_400),
        }
    }
}

fn invalid(field: &str, message: &str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
