//! Odos aggregator backend
//!
//! Wraps the odos-sdk swap builder. Odos represents the native asset with the
//! zero address instead of the 0xEeee... sentinel, and it never partially
//! fills, so the full amount is routed or the request fails.

use super::{QuoteProvider, QuoteRequest, SwapQuote};
use crate::tokens::{addresses, chains, AssetId};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use odos_sdk::{Chain, Slippage};
use std::time::Duration;
use tracing::debug;

/// Quote provider backed by the Odos router
pub struct OdosQuoteProvider {
    client: odos_sdk::OdosClient,
    chain: Chain,
    slippage_percent: u8,
    timeout: Duration,
}

impl OdosQuoteProvider {
    pub fn new(chain_id: u64, slippage_percent: u8, timeout: Duration) -> Result<Self> {
        let chain = Self::chain_from_id(chain_id).ok_or_else(|| {
            Error::Config(format!("Odos does not support chain ID {}", chain_id))
        })?;
        let client = odos_sdk::OdosClient::new()
            .map_err(|e| Error::Config(format!("Failed to create Odos client: {}", e)))?;

        Ok(Self {
            client,
            chain,
            slippage_percent,
            timeout,
        })
    }

    fn chain_from_id(chain_id: u64) -> Option<Chain> {
        match chain_id {
            chains::ETHEREUM => Some(Chain::ethereum()),
            chains::ARBITRUM => Some(Chain::arbitrum()),
            chains::OPTIMISM => Some(Chain::optimism()),
            chains::BASE => Some(Chain::base()),
            _ => None,
        }
    }

    /// Odos token address for an asset
    fn odos_token(asset: &AssetId) -> Address {
        if asset.is_native() {
            addresses::ZERO_ADDRESS
        } else {
            asset.address()
        }
    }
}

#[async_trait]
impl QuoteProvider for OdosQuoteProvider {
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        let slippage = Slippage::percent(f64::from(self.slippage_percent))
            .map_err(|e| Error::Config(format!("Invalid slippage: {}", e)))?;

        debug!(
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            "Requesting Odos swap transaction"
        );

        let builder = self
            .client
            .swap()
            .chain(self.chain)
            .from_token(Self::odos_token(&request.from), request.amount.base_units())
            .to_token(Self::odos_token(&request.to))
            .slippage(slippage)
            .signer(request.sender);
        let build = builder.build_transaction();

        let tx = tokio::time::timeout(self.timeout, build)
            .await
            .map_err(|_| {
                Error::NoRouteAvailable(format!(
                    "Odos did not respond within {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::NoRouteAvailable(format!("Odos transaction build failed: {}", e)))?;

        let target_contract = tx
            .to
            .and_then(|kind| kind.to().copied())
            .ok_or_else(|| Error::QuoteMalformed("Odos transaction has no target".to_string()))?;
        let calldata: Bytes = tx
            .input
            .input
            .clone()
            .filter(|data| !data.is_empty())
            .ok_or_else(|| Error::QuoteMalformed("Odos transaction has no calldata".to_string()))?;
        let gas_estimate = tx
            .gas
            .ok_or_else(|| Error::QuoteMalformed("Odos transaction has no gas limit".to_string()))?;

        Ok(SwapQuote {
            target_contract,
            calldata,
            native_value: tx.value.unwrap_or(U256::ZERO),
            gas_estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::NATIVE_ASSET;

    #[test]
    fn test_chain_from_id() {
        assert!(OdosQuoteProvider::chain_from_id(chains::ETHEREUM).is_some());
        assert!(OdosQuoteProvider::chain_from_id(chains::ARBITRUM).is_some());
        assert!(OdosQuoteProvider::chain_from_id(chains::OPTIMISM).is_some());
        assert!(OdosQuoteProvider::chain_from_id(chains::BASE).is_some());
        assert!(OdosQuoteProvider::chain_from_id(999).is_none());
    }

    #[test]
    fn test_native_maps_to_zero_address() {
        assert_eq!(
            OdosQuoteProvider::odos_token(&NATIVE_ASSET),
            addresses::ZERO_ADDRESS
        );
        let usdc = AssetId::new(addresses::USDC_BASE);
        assert_eq!(OdosQuoteProvider::odos_token(&usdc), addresses::USDC_BASE);
    }

    #[test]
    fn test_unsupported_chain_is_config_error() {
        let err = OdosQuoteProvider::new(999, 1, Duration::from_secs(1)).err();
        assert!(matches!(err, Some(Error::Config(_))));
    }
}
