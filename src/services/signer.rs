// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use crate::infrastructure::network::gas::GasFees;
use alloy::consensus::{SignableTransaction, TxEip1559};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip2930::AccessList;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy_consensus::TxEnvelope;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug)]
pub struct UnsignedCall {
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    pub nonce: u64,
    pub fees: GasFees,
}

#[derive(Clone, Debug)]
pub struct SignedTx {
    pub raw: Bytes,
    pub hash: B256,
}

/// Local execution keys, addressed by index.
#[derive(Clone)]
pub struct SignerPool {
    signers: Arc<Vec<PrivateKeySigner>>,
    chain_id: u64,
    cursor: Arc<AtomicUsize>,
}

impl SignerPool {
    pub fn new(signers: Vec<PrivateKeySigner>, chain_id: u64) -> Result<Self, AppError> {
        if signers.is_empty() {
            return Err(AppError::Config("at least one execution key is required".into()));
        }
        Ok(Self {
            signers: Arc::new(signers),
            chain_id,
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self, index: usize) -> Option<Address> {
        self.signers.get(index).map(|s| s.address())
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }

    pub fn index_of(&self, address: Address) -> Option<usize> {
        self.signers.iter().position(|s| s.address() == address)
    }

    /// Round-robin account choice.
    pub fn next_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.signers.len()
    }

    pub fn sign(&self, index: usize, call: &UnsignedCall) -> Result<SignedTx, AppError> {
        let signer = self
            .signers
            .get(index)
            .ok_or_else(|| AppError::Strategy(format!("no execution account #{index}")))?;
        let mut tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce: call.nonce,
            max_priority_fee_per_gas: call.fees.max_priority_fee_per_gas,
            max_fee_per_gas: call.fees.max_fee_per_gas,
            gas_limit: call.gas_limit,
            to: TxKind::Call(call.to),
            value: call.value,
            access_list: AccessList::default(),
            input: call.input.clone(),
        };
        let sig = TxSignerSync::sign_transaction_sync(signer, &mut tx)
            .map_err(|e| AppError::Strategy(format!("Sign tx failed: {}", e)))?;
        let signed: TxEnvelope = tx.into_signed(sig).into();
        Ok(SignedTx {
            raw: Bytes::from(signed.encoded_2718()),
            hash: *signed.tx_hash(),
        })
    }
}
