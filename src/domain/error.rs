// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Transaction failed: {hash:?}, reason: {reason}")]
    Transaction { hash: String, reason: String },

    #[error("Simulation failed for pool {pool}: {reason}")]
    Simulation { pool: String, reason: String },

    #[error("Strategy execution error: {0}")]
    Strategy(String),

    #[error("External API error: {provider} responded with {status}")]
    ApiCall { provider: String, status: u16 },

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Address {0} is invalid or not checksummed")]
    InvalidAddress(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Network-level failures worth retrying on the next block.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Connection(_) | AppError::Timeout(_) | AppError::ApiCall { .. }
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_covers_network_failures() {
        assert!(AppError::Connection("reset".into()).is_transient());
        assert!(AppError::Timeout(500).is_transient());
        assert!(
            !AppError::Transaction {
                hash: "0x0".into(),
                reason: "reverted".into()
            }
            .is_transient()
        );
    }
}
