// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::infrastructure::network::chain::ChainClient;
use alloy::primitives::Address;
use std::sync::{Arc, Mutex};

/// Per-account nonce cache; one execution worker owns each manager.
#[derive(Clone)]
pub struct NonceManager {
    chain: Arc<dyn ChainClient>,
    address: Address,
    next: Arc<Mutex<Option<u64>>>,
}

impl NonceManager {
    pub fn new(chain: Arc<dyn ChainClient>, address: Address) -> Self {
        Self {
            chain,
            address,
            next: Arc::new(Mutex::new(None)),
        }
    }

    /// Hand out the next nonce, fetching the pending count on a cold cache.
    pub async fn reserve(&self) -> Result<u64, AppError> {
        if let Some(nonce) = self.take_cached() {
            return Ok(nonce);
        }
        let on_chain = self.chain.transaction_count(self.address).await?;
        *self.lock() = Some(on_chain + 1);
        Ok(on_chain)
    }

    /// Drop the cache so the next `reserve` re-reads the chain.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn take_cached(&self) -> Option<u64> {
        let mut guard = self.lock();
        let current = (*guard)?;
        *guard = Some(current + 1);
        Some(current)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<u64>> {
        self.next.lock().unwrap_or_else(|e| e.into_inner())
    }
}
