// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use oxidity_sniper::app::config::GlobalSettings;
use oxidity_sniper::app::logging::setup_logging;
use oxidity_sniper::domain::error::AppError;
use oxidity_sniper::infrastructure::data::db::Database;
use oxidity_sniper::infrastructure::network::chain::{AlloyChainClient, ChainClient};
use oxidity_sniper::infrastructure::network::provider::ConnectionFactory;
use oxidity_sniper::infrastructure::network::reputation::{ExplorerReputation, ReputationOracle};
use oxidity_sniper::services::engine::Engine;
use oxidity_sniper::services::signer::SignerPool;
use oxidity_sniper::services::strategy::inspector::Inspector;
use oxidity_sniper::services::strategy::simulation::EthCallSimulator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about = "oxidity sniper")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Sign nothing; every order is acked as failed
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Metrics port (overrides config/env)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Skip creator blacklist, source verification and activity checks
    #[arg(long, default_value_t = false)]
    no_reputation: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(
        if settings.debug { "debug" } else { "info" },
        settings.log_json,
    );

    let db = Database::new(&settings.database_url()).await?;
    let (http, ws) = ConnectionFactory::connect(
        &settings.http_provider,
        settings.websocket_provider_value().as_deref(),
    )
    .await?;
    let chain = Arc::new(AlloyChainClient::new(http.clone(), ws));
    let chain_id = chain.chain_id().await?;
    tracing::info!(target: "config", chain_id, rpc = %settings.http_provider, "Connected to chain");

    let signers = SignerPool::new(settings.signers()?, chain_id)?;
    for (idx, address) in signers.addresses().iter().enumerate() {
        tracing::info!(target: "config", account = idx, %address, "Execution account loaded");
    }

    let probe_bot = settings
        .probe_bot_address
        .ok_or_else(|| AppError::Config("PROBE_BOT_ADDRESS is required".to_string()))?;
    let caller = signers.address(0).unwrap_or_default();
    let simulator = Arc::new(EthCallSimulator::new(http, probe_bot, caller));

    let inspector_config = settings.inspector_config(!cli.no_reputation);
    let reputation: Option<Arc<dyn ReputationOracle>> = if inspector_config.reputation_enabled {
        if settings.etherscan_api_key_value().is_none() {
            tracing::warn!(target: "config", "ETHERSCAN_API_KEY not set; explorer calls may be rate limited");
        }
        Some(Arc::new(ExplorerReputation::new(
            settings.reputation_config(),
            db.clone(),
        )?))
    } else {
        tracing::info!(target: "config", "Reputation checks disabled");
        None
    };
    let inspector = Inspector::new(inspector_config, simulator, reputation);

    let metrics_port = cli.metrics_port.unwrap_or(settings.metrics_port);
    let shutdown = CancellationToken::new();
    let engine = Engine::new(
        chain,
        db,
        inspector,
        signers,
        settings.strategy_config(),
        settings.feed_config(),
        settings.gateway_config(chain_id, cli.dry_run),
        Some(metrics_port),
        shutdown.clone(),
    );

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "strategy", "Ctrl-C received; shutting down");
            signal_token.cancel();
        }
    });

    if cli.dry_run {
        tracing::warn!(target: "config", "Dry run: orders are logged and acked as failed");
    }
    engine.run().await
}
