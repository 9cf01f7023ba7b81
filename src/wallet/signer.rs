//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - The key is derived once from the seed phrase and held in alloy's
//!   PrivateKeySigner
//! - Neither the phrase nor the key is serialized or logged
//! - Callers only get the address and signatures

use super::{SignedTransaction, Signer};
use crate::chain::NonceSource;
use crate::executor::TransactionDraft;
use crate::{Error, Result};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, B256};
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use alloy::signers::{Signature, SignerSync};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;

/// Wallet derived from a BIP-39 seed phrase
///
/// The private key is:
/// - Derived at `m/44'/60'/0'/0/{index}`
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations
pub struct SecureWallet {
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
}

impl SecureWallet {
    /// Derive the wallet at account `index` from an English seed phrase
    pub fn from_mnemonic(phrase: &SecretString, index: u32) -> Result<Self> {
        let signer = MnemonicBuilder::<English>::default()
            .phrase(phrase.expose_secret())
            .index(index)
            .map_err(|e| Error::Wallet(format!("Invalid derivation index {}: {}", index, e)))?
            .build()
            // The phrase itself never goes into the message
            .map_err(|e| Error::Wallet(format!("Invalid seed phrase: {}", e)))?;

        let address = signer.address();
        debug!(address = %address, index, "Wallet derived");

        Ok(Self { signer, address })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte hash
    ///
    /// This is the ONLY way to use the private key.
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// [`Signer`] producing legacy EIP-155 transactions for one chain
pub struct WalletSigner {
    wallet: Arc<SecureWallet>,
    chain_id: u64,
    nonces: Arc<dyn NonceSource>,
}

impl WalletSigner {
    pub fn new(wallet: Arc<SecureWallet>, chain_id: u64, nonces: Arc<dyn NonceSource>) -> Self {
        Self {
            wallet,
            chain_id,
            nonces,
        }
    }

    /// Sign `draft` with an explicit nonce
    fn sign_with_nonce(&self, draft: &TransactionDraft, nonce: u64) -> Result<SignedTransaction> {
        if draft.gas_limit == 0 {
            return Err(Error::SigningFailed("draft has zero gas limit".to_string()));
        }

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price: draft.gas_price,
            gas_limit: draft.gas_limit,
            to: TxKind::Call(draft.to),
            value: draft.value,
            input: draft.data.clone(),
        };

        let signature = self
            .wallet
            .sign_hash(&tx.signature_hash())
            .map_err(|e| Error::SigningFailed(e.to_string()))?;
        let signed = tx.into_signed(signature);
        let tx_hash = *signed.hash();
        let raw = TxEnvelope::Legacy(signed).encoded_2718();

        Ok(SignedTransaction::new(Bytes::from(raw), tx_hash))
    }
}

#[async_trait]
impl Signer for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign(&self, draft: &TransactionDraft) -> Result<SignedTransaction> {
        let nonce = self
            .nonces
            .pending_nonce(self.wallet.address())
            .await
            .map_err(|e| Error::SigningFailed(format!("Nonce lookup failed: {}", e)))?;

        let signed = self.sign_with_nonce(draft, nonce)?;
        debug!(
            nonce,
            chain_id = self.chain_id,
            tx_hash = %signed.tx_hash(),
            "Transaction signed"
        );
        Ok(signed)
    }
}
