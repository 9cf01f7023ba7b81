//! 1inch swap API client
//!
//! `GET {base_url}/{chain_id}/swap` returns the router call for a swap. Partial
//! fills are refused and estimation is left enabled, so the aggregator
//! rejects any route it cannot execute atomically for the full amount.

use super::{QuoteProvider, QuoteRequest, SwapQuote};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// 1inch swap endpoint client
pub struct OneInchQuoteProvider {
    client: Client,
    base_url: String,
    chain_id: u64,
    /// Slippage tolerance in whole percent
    slippage_percent: u8,
    api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct SwapResponse {
    tx: SwapTx,
}

#[derive(Debug, Deserialize)]
struct SwapTx {
    to: String,
    data: String,
    value: NumericField,
    gas: NumericField,
}

/// 1inch sends `value` as a string and `gas` as either a string or a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Number(u64),
    Text(String),
}

impl NumericField {
    fn to_u256(&self, field: &str) -> Result<U256> {
        match self {
            NumericField::Number(n) => Ok(U256::from(*n)),
            NumericField::Text(s) => U256::from_str_radix(s.trim(), 10).map_err(|e| {
                Error::QuoteMalformed(format!("tx.{} is not a decimal integer: {}", field, e))
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    description: Option<String>,
}

impl OneInchQuoteProvider {
    pub fn new(
        base_url: &str,
        chain_id: u64,
        slippage_percent: u8,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build aggregator HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            slippage_percent,
            api_key,
        })
    }

    fn query_params(&self, request: &QuoteRequest) -> Vec<(&'static str, String)> {
        vec![
            ("fromTokenAddress", request.from.canonical()),
            ("toTokenAddress", request.to.canonical()),
            ("amount", request.amount.base_units().to_string()),
            ("fromAddress", format!("{:?}", request.sender)),
            ("slippage", self.slippage_percent.to_string()),
            ("disableEstimate", "false".to_string()),
            ("allowPartialFill", "false".to_string()),
        ]
    }
}

#[async_trait]
impl QuoteProvider for OneInchQuoteProvider {
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
        let url = format!("{}/{}/swap", self.base_url, self.chain_id);

        debug!(
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            sender = %request.sender,
            "Requesting 1inch swap quote"
        );

        let mut http = self.client.get(&url).query(&self.query_params(request));
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }

        let response = http
            .send()
            .await
            .map_err(|e| Error::NoRouteAvailable(format!("1inch request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::NoRouteAvailable(format!("1inch response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(Error::NoRouteAvailable(rejection_reason(
                status.as_u16(),
                &body,
            )));
        }

        parse_swap_response(&body)
    }
}

/// Human-readable reason from a non-2xx aggregator response
fn rejection_reason(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    match (parsed.description, parsed.error) {
        (Some(description), _) => format!("1inch HTTP {}: {}", status, description),
        (None, Some(error)) => format!("1inch HTTP {}: {}", status, error),
        (None, None) => format!("1inch HTTP {}", status),
    }
}

fn parse_swap_response(body: &str) -> Result<SwapQuote> {
    let response: SwapResponse = serde_json::from_str(body)
        .map_err(|e| Error::QuoteMalformed(format!("Unexpected 1inch response: {}", e)))?;
    let tx = response.tx;

    let target_contract = Address::from_str(&tx.to.trim().to_lowercase())
        .map_err(|e| Error::QuoteMalformed(format!("tx.to is not an address: {}", e)))?;
    let calldata = Bytes::from_str(tx.data.trim())
        .map_err(|e| Error::QuoteMalformed(format!("tx.data is not hex: {}", e)))?;
    if calldata.is_empty() {
        return Err(Error::QuoteMalformed("tx.data is empty".to_string()));
    }

    let native_value = tx.value.to_u256("value")?;
    let gas_estimate = u64::try_from(tx.gas.to_u256("gas")?)
        .map_err(|_| Error::QuoteMalformed("tx.gas exceeds u64".to_string()))?;

    Ok(SwapQuote {
        target_contract,
        calldata,
        native_value,
        gas_estimate,
    })
}
