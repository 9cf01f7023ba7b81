//! Secure wallet management
//!
//! This module handles key derivation and transaction signing.
//! The private key NEVER leaves this module.

mod signer;
mod simulator;

pub use signer::{SecureWallet, WalletSigner};
pub use simulator::{SimulationResult, TransactionSimulator};

use crate::executor::TransactionDraft;
use crate::Result;
use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;

/// A signed, EIP-2718 encoded transaction.
///
/// Deliberately not `Clone`: broadcasting consumes it, so the same bytes
/// cannot be handed to the network twice by accident.
#[derive(Debug)]
pub struct SignedTransaction {
    raw: Bytes,
    tx_hash: B256,
}

impl SignedTransaction {
    pub fn new(raw: Bytes, tx_hash: B256) -> Self {
        Self { raw, tx_hash }
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn into_raw(self) -> Bytes {
        self.raw
    }
}

/// Signs transaction drafts for one address
#[async_trait]
pub trait Signer: Send + Sync {
    /// Address transactions are sent from (safe to share)
    fn address(&self) -> Address;

    /// Sign `draft`; any failure is `SigningFailed`
    async fn sign(&self, draft: &TransactionDraft) -> Result<SignedTransaction>;
}
