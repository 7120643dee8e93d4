// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use alloy::network::Ethereum;
use alloy::providers::RootProvider;
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;
pub type WsProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = RootProvider::new_http(url);
        Ok(provider)
    }

    pub async fn ws(ws_url: &str) -> Result<WsProvider, AppError> {
        let provider = RootProvider::connect(ws_url)
            .await
            .map_err(|e| AppError::Connection(format!("WS Connection failed: {}", e)))?;

        Ok(provider)
    }

    /// HTTP is mandatory; a failed WS connection degrades to block polling.
    pub async fn connect(
        http_url: &str,
        ws_url: Option<&str>,
    ) -> Result<(HttpProvider, Option<WsProvider>), AppError> {
        let http = Self::http(http_url)?;
        let ws = match ws_url {
            Some(url) => match Self::ws(url).await {
                Ok(ws) => Some(ws),
                Err(e) => {
                    tracing::warn!(target: "rpc", error = %e, "WS unavailable; new heads will be polled over HTTP");
                    None
                }
            },
            None => None,
        };
        Ok((http, ws))
    }
}
