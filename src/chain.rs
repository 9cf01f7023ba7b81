//! Chain access over JSON-RPC
//!
//! The only write path is a single `eth_sendRawTransaction` per signed
//! transaction. A broadcast that errors or times out is reported as
//! [`Error::BroadcastFailed`] carrying the hash, because the node may have
//! accepted the bytes before the failure was observed.

use crate::config::RpcConfig;
use crate::wallet::SignedTransaction;
use crate::{Error, Result};
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, RootProvider};
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{info, warn};

/// Submits signed transactions
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Broadcast once, consuming the transaction; never retried
    async fn send_signed(&self, tx: SignedTransaction) -> Result<B256>;
}

/// Source of the next usable nonce for an address
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Transaction count including pending transactions
    async fn pending_nonce(&self, address: Address) -> Result<u64>;
}

/// [`ChainClient`] and [`NonceSource`] over an alloy HTTP provider
#[derive(Clone)]
pub struct RpcChainClient {
    provider: RootProvider,
    timeout: Duration,
}

impl RpcChainClient {
    pub fn connect(rpc: &RpcConfig, timeout: Duration) -> Result<Self> {
        let url = rpc.url().ok_or_else(|| {
            Error::Config(format!("No RPC URL configured for chain {}", rpc.chain_id()))
        })?;
        // The parse error would echo the URL, which may embed an API key
        let url: url::Url = url
            .parse()
            .map_err(|_| Error::Config("RPC URL is not a valid URL".to_string()))?;

        info!(chain_id = rpc.chain_id(), source = ?rpc.source(), "Connecting to RPC");

        Ok(Self {
            provider: RootProvider::new_http(url),
            timeout,
        })
    }

    /// Read-only handle for simulation
    pub fn provider(&self) -> &RootProvider {
        &self.provider
    }

    /// Chain ID reported by the node
    pub async fn chain_id(&self) -> Result<u64> {
        self.with_timeout("eth_chainId", self.provider.get_chain_id())
            .await?
            .map_err(|e| Error::Config(format!("eth_chainId failed: {}", e)))
    }

    async fn with_timeout<F: IntoFuture>(&self, method: &str, fut: F) -> Result<F::Output> {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            Error::Config(format!(
                "{} did not respond within {}ms",
                method,
                self.timeout.as_millis()
            ))
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn send_signed(&self, tx: SignedTransaction) -> Result<B256> {
        let tx_hash = tx.tx_hash();
        let raw = tx.into_raw();

        let sent = tokio::time::timeout(self.timeout, self.provider.send_raw_transaction(&raw))
            .await
            .map_err(|_| Error::BroadcastFailed {
                tx_hash,
                reason: format!("no response within {}ms", self.timeout.as_millis()),
            })?
            .map_err(|e| Error::BroadcastFailed {
                tx_hash,
                reason: e.to_string(),
            })?;

        let node_hash = *sent.tx_hash();
        if node_hash != tx_hash {
            warn!(
                local = %tx_hash,
                node = %node_hash,
                "Node reported a different transaction hash"
            );
        }
        Ok(node_hash)
    }
}

#[async_trait]
impl NonceSource for RpcChainClient {
    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        self.with_timeout(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending(),
        )
        .await?
        .map_err(|e| Error::Config(format!("eth_getTransactionCount failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    fn unreachable_client() -> RpcChainClient {
        let rpc = RpcConfig::with_url(8453, "http://127.0.0.1:9");
        RpcChainClient::connect(&rpc, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_connect_requires_url() {
        let rpc = RpcConfig::with_url(8453, "not a url with key=secret");
        let err = RpcChainClient::connect(&rpc, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_unreachable_node_broadcast_is_ambiguous() {
        let client = unreachable_client();
        let hash = B256::repeat_byte(0x42);
        let tx = SignedTransaction::new(Bytes::from(vec![0xf8, 0x6b]), hash);

        match client.send_signed(tx).await {
            Err(Error::BroadcastFailed { tx_hash, .. }) => assert_eq!(tx_hash, hash),
            other => panic!("expected BroadcastFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_nonce_fails() {
        let client = unreachable_client();
        assert!(client.pending_nonce(Address::ZERO).await.is_err());
        assert!(client.chain_id().await.is_err());
    }
}
