// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::services::strategy::strategy::{Strategy, StrategyStats};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub async fn spawn_metrics_server(
    port: u16,
    strategy: Arc<Strategy>,
    shutdown: CancellationToken,
) -> Option<SocketAddr> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(target: "metrics", error = %e, "Metrics server failed to bind");
            return None;
        }
    };

    let local = listener.local_addr().ok();
    if let Some(addr) = local {
        tracing::info!(target: "metrics", %addr, "Metrics server listening");
    }

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, _)) => serve(socket, &strategy).await,
                    Err(e) => {
                        tracing::warn!(target: "metrics", error = %e, "Metrics accept error");
                        continue;
                    }
                }
            }
        }
    });

    local
}

async fn serve(mut socket: TcpStream, strategy: &Strategy) {
    // first request line is all we route on
    let mut buf = [0u8; 1024];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let req = String::from_utf8_lossy(&buf[..n]).to_string();
    let path = req
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let route = path.split_once('?').map_or(path, |(r, _)| r);

    let stats = strategy.stats();
    let (content_type, body) = if route.starts_with("/dashboard") {
        ("application/json", render_dashboard_json(&stats))
    } else if route.starts_with("/resume") {
        strategy.resume().await;
        tracing::warn!(target: "metrics", "Circuit breaker re-armed by operator");
        (
            "application/json",
            json!({"status": "ok", "autoRun": strategy.is_auto_run().await}).to_string(),
        )
    } else {
        ("text/plain", render_metrics(&stats))
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
}

fn render_metrics(stats: &StrategyStats) -> String {
    let counters = [
        ("sniper_blocks_processed", stats.blocks.load(Ordering::Relaxed)),
        ("sniper_pools_discovered", stats.pools_discovered.load(Ordering::Relaxed)),
        ("sniper_pools_admitted", stats.pools_admitted.load(Ordering::Relaxed)),
        ("sniper_pools_evicted", stats.pools_evicted.load(Ordering::Relaxed)),
        ("sniper_buy_orders", stats.buy_orders.load(Ordering::Relaxed)),
        ("sniper_sell_orders", stats.sell_orders.load(Ordering::Relaxed)),
        ("sniper_acks_succeeded", stats.acks_succeeded.load(Ordering::Relaxed)),
        ("sniper_acks_failed", stats.acks_failed.load(Ordering::Relaxed)),
        ("sniper_positions_closed", stats.positions_closed.load(Ordering::Relaxed)),
    ];
    let mut body = String::new();
    for (name, value) in counters {
        body.push_str(&format!("# TYPE {name} counter\n{name} {value}\n"));
    }
    body.push_str(&format!(
        concat!(
            "# TYPE sniper_watchlist_size gauge\nsniper_watchlist_size {}\n",
            "# TYPE sniper_inventory_size gauge\nsniper_inventory_size {}\n",
            "# TYPE sniper_daily_pnl_pct gauge\nsniper_daily_pnl_pct {}\n",
            "# TYPE sniper_auto_run gauge\nsniper_auto_run {}\n"
        ),
        stats.watchlist_size.load(Ordering::Relaxed),
        stats.inventory_size.load(Ordering::Relaxed),
        stats.daily_pnl(),
        u8::from(stats.auto_run.load(Ordering::Relaxed)),
    ));
    body
}

fn render_dashboard_json(stats: &StrategyStats) -> String {
    let succeeded = stats.acks_succeeded.load(Ordering::Relaxed);
    let failed = stats.acks_failed.load(Ordering::Relaxed);
    let total = succeeded + failed;
    let success_rate = if total > 0 {
        succeeded as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    json!({
        "blocks": stats.blocks.load(Ordering::Relaxed),
        "poolsDiscovered": stats.pools_discovered.load(Ordering::Relaxed),
        "poolsAdmitted": stats.pools_admitted.load(Ordering::Relaxed),
        "poolsEvicted": stats.pools_evicted.load(Ordering::Relaxed),
        "buyOrders": stats.buy_orders.load(Ordering::Relaxed),
        "sellOrders": stats.sell_orders.load(Ordering::Relaxed),
        "positionsClosed": stats.positions_closed.load(Ordering::Relaxed),
        "watchlist": stats.watchlist_size.load(Ordering::Relaxed),
        "inventory": stats.inventory_size.load(Ordering::Relaxed),
        "successRate": success_rate,
        "dailyPnlPct": stats.daily_pnl(),
        "autoRun": stats.auto_run.load(Ordering::Relaxed),
    })
    .to_string()
}
