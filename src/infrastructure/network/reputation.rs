// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::time_utils::current_unix;
use crate::domain::error::AppError;
use crate::domain::types::Pool;
use crate::infrastructure::data::db::Database;
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ReputationConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Blacklist entries older than this are ignored.
    pub blacklist_window_secs: u64,
}

/// Creator and contract checks that gate admission and reinspection.
#[async_trait]
pub trait ReputationOracle: Send + Sync {
    async fn is_blacklisted(&self, creator: Address) -> Result<bool, AppError>;

    async fn is_verified(&self, token: Address) -> Result<bool, AppError>;

    /// Creator transactions into the token contract within the block range.
    async fn count_suspicious_activity(
        &self,
        pool: &Pool,
        from_block: u64,
        to_block: u64,
    ) -> Result<u64, AppError>;
}

/// Block-explorer backed oracle with the local blacklist table.
#[derive(Clone)]
pub struct ExplorerReputation {
    client: Client,
    config: ReputationConfig,
    db: Database,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse<T> {
    status: String,
    #[serde(default)]
    message: String,
    result: T,
}

#[derive(Debug, Deserialize)]
struct SourceCodeEntry {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "Library", default)]
    library: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerTx {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

impl ExplorerReputation {
    pub fn new(config: ReputationConfig, db: Database) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .map_err(|e| AppError::Initialization(format!("explorer client: {e}")))?;
        Ok(Self { client, config, db })
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, String)],
        label: &str,
    ) -> Result<ExplorerResponse<T>, AppError> {
        let mut request = self.client.get(&self.config.api_url).query(params);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("apikey", key)]);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Explorer {label} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: format!("Explorer {label}"),
                status: resp.status().as_u16(),
            });
        }
        resp.json()
            .await
            .map_err(|e| AppError::Initialization(format!("Explorer {label} decode failed: {e}")))
    }
}

fn is_verified_source(response: &ExplorerResponse<Vec<SourceCodeEntry>>) -> bool {
    response.status == "1"
        && response
            .result
            .first()
            .is_some_and(|entry| !entry.source_code.trim().is_empty() && entry.library.trim().is_empty())
}

fn count_creator_calls(txs: &[ExplorerTx], creator: Address, token: Address) -> u64 {
    let creator = format!("{creator:#x}");
    let token = format!("{token:#x}");
    txs.iter()
        .filter(|tx| tx.from.eq_ignore_ascii_case(&creator) && tx.to.eq_ignore_ascii_case(&token))
        .count() as u64
}

#[async_trait]
impl ReputationOracle for ExplorerReputation {
    async fn is_blacklisted(&self, creator: Address) -> Result<bool, AppError> {
        let since = current_unix().saturating_sub(self.config.blacklist_window_secs);
        self.db.is_blacklisted_since(creator, since).await
    }

    async fn is_verified(&self, token: Address) -> Result<bool, AppError> {
        let response: ExplorerResponse<Vec<SourceCodeEntry>> = self
            .query(
                &[
                    ("module", "contract".into()),
                    ("action", "getsourcecode".into()),
                    ("address", format!("{token:#x}")),
                ],
                "getsourcecode",
            )
            .await?;
        Ok(is_verified_source(&response))
    }

    async fn count_suspicious_activity(
        &self,
        pool: &Pool,
        from_block: u64,
        to_block: u64,
    ) -> Result<u64, AppError> {
        let Some(creator) = pool.creator else {
            return Ok(0);
        };
        if from_block > to_block {
            return Ok(0);
        }
        // "No transactions found" comes back as status 0 with a string result.
        let response: ExplorerResponse<serde_json::Value> = self
            .query(
                &[
                    ("module", "account".into()),
                    ("action", "txlist".into()),
                    ("address", format!("{:#x}", pool.token)),
                    ("startblock", from_block.to_string()),
                    ("endblock", to_block.to_string()),
                    ("sort", "asc".into()),
                ],
                "txlist",
            )
            .await?;
        if response.status != "1" {
            tracing::debug!(
                target: "inspector",
                token = %pool.token,
                message = %response.message,
                "No explorer activity for token"
            );
            return Ok(0);
        }
        let txs: Vec<ExplorerTx> = serde_json::from_value(response.result)
            .map_err(|e| AppError::Initialization(format!("Explorer txlist decode failed: {e}")))?;
        Ok(count_creator_calls(&txs, creator, pool.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(status: &str, code: &str, library: &str) -> ExplorerResponse<Vec<SourceCodeEntry>> {
        let raw = serde_json::json!({
            "status": status,
            "message": "OK",
            "result": [{ "SourceCode": code, "Library": library, "ContractName": "Token" }]
        });
        serde_json::from_value(raw).expect("decode")
    }

    #[test]
    fn verification_needs_source_and_no_linked_libraries() {
        assert!(is_verified_source(&source("1", "contract T {}", "")));
        assert!(!is_verified_source(&source("1", "", "")));
        assert!(!is_verified_source(&source("1", "contract T {}", "SafeMath:0x01")));
        assert!(!is_verified_source(&source("0", "contract T {}", "")));
    }

    #[test]
    fn creator_calls_match_case_insensitively() {
        let creator = Address::from([0xaa; 20]);
        let token = Address::from([0xbb; 20]);
        let txs: Vec<ExplorerTx> = serde_json::from_value(serde_json::json!([
            { "from": format!("{creator:#x}").to_uppercase().replace("0X", "0x"), "to": format!("{token:#x}") },
            { "from": format!("{creator:#x}"), "to": format!("{:#x}", Address::from([0xcc; 20])) },
            { "from": format!("{:#x}", Address::from([0xdd; 20])), "to": format!("{token:#x}") },
            { "from": format!("{creator:#x}"), "to": format!("{token:#x}") }
        ]))
        .expect("decode");
        assert_eq!(count_creator_calls(&txs, creator, token), 2);
    }

    #[tokio::test]
    async fn blacklist_respects_window() {
        let db = Database::new("sqlite::memory:").await.expect("db");
        let creator = Address::from([0x11; 20]);
        let stale = Address::from([0x22; 20]);
        let now = current_unix();
        db.add_blacklist(creator, "honeypot", now).await.expect("insert");
        db.add_blacklist(stale, "honeypot", now - 40 * 86_400).await.expect("insert");

        let oracle = ExplorerReputation::new(
            ReputationConfig {
                api_url: "http://127.0.0.1:9".into(),
                api_key: None,
                blacklist_window_secs: 30 * 86_400,
            },
            db,
        )
        .expect("oracle");
        assert!(oracle.is_blacklisted(creator).await.expect("lookup"));
        assert!(!oracle.is_blacklisted(stale).await.expect("lookup"));
        assert!(!oracle.is_blacklisted(Address::ZERO).await.expect("lookup"));
    }

    #[tokio::test]
    async fn txlist_without_creator_is_zero_without_network() {
        let db = Database::new("sqlite::memory:").await.expect("db");
        let oracle = ExplorerReputation::new(
            ReputationConfig {
                api_url: "http://127.0.0.1:9".into(),
                api_key: Some("key".into()),
                blacklist_window_secs: 86_400,
            },
            db,
        )
        .expect("oracle");
        let pool = Pool::new(Address::from([1; 20]), Address::from([2; 20]), 0, 0, 1);
        assert_eq!(oracle.count_suspicious_activity(&pool, 1, 10).await.expect("count"), 0);
    }
}
