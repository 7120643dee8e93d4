// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const QUIET_MODULES: &[&str] = &[
    "h2",
    "hyper",
    "hyper_util",
    "reqwest",
    "tokio_tungstenite",
    "alloy_transport_http",
    "alloy_pubsub",
    "sqlx",
];

/// Expand a bare level (e.g. "debug") with quiet defaults for transport crates.
/// Directive strings (with ',' or '=') are respected as-is.
pub fn filter_directives(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        return normalized.to_string();
    }
    let base = if normalized.is_empty() { "info" } else { normalized };
    let mut directives = base.to_string();
    for module in QUIET_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    directives
}

pub fn setup_logging(log_level: &str, json_format: bool) {
    let directives = filter_directives(log_level);
    let filter = EnvFilter::from_str(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).try_init().is_ok()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .compact();
        subscriber.with(fmt_layer).try_init().is_ok()
    };

    if installed {
        tracing::info!(
            filter = %directives,
            format = if json_format { "json" } else { "compact" },
            "Logging initialized"
        );
    }
}
