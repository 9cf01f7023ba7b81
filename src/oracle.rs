//! Fiat price discovery for the native asset
//!
//! Each lookup is a fresh HTTP read; prices are never cached and a failed
//! lookup never falls back to an estimate.

use crate::config::OracleConfig;
use crate::tokens::AssetId;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Header carrying a CoinGecko demo API key
const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";

/// A fiat price observed for one asset at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub asset: AssetId,
    /// Fiat units per whole unit of the asset; always positive
    pub fiat_per_unit: Decimal,
    pub fetched_at: DateTime<Utc>,
}

/// Source of current fiat prices
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_fiat_price(&self, asset: AssetId) -> Result<PriceQuote>;
}

/// CoinGecko `simple/price` client
pub struct CoinGeckoOracle {
    client: Client,
    base_url: String,
    /// CoinGecko id of the native asset (e.g. "ethereum")
    coin_id: String,
    /// Quote currency (e.g. "usd")
    vs_currency: String,
    /// The only asset this oracle prices
    native_asset: AssetId,
    api_key: Option<SecretString>,
}

impl CoinGeckoOracle {
    pub fn new(
        config: &OracleConfig,
        native_asset: AssetId,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build oracle HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            coin_id: config.coin_id.clone(),
            vs_currency: config.vs_currency.to_lowercase(),
            native_asset,
            api_key,
        })
    }

    async fn fetch(&self) -> Result<Value> {
        let url = format!("{}/simple/price", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("ids", self.coin_id.as_str()),
            ("vs_currencies", self.vs_currency.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(DEMO_KEY_HEADER, key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("Price request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::OracleUnavailable(format!(
                "Price service returned HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::OracleUnavailable(format!("Unreadable price response: {}", e)))
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn get_fiat_price(&self, asset: AssetId) -> Result<PriceQuote> {
        if asset != self.native_asset {
            return Err(Error::OracleUnavailable(format!(
                "No price source configured for asset {}",
                asset
            )));
        }

        let body = self.fetch().await?;
        let fiat_per_unit = parse_price(&body, &self.coin_id, &self.vs_currency)?;

        debug!(
            coin = %self.coin_id,
            currency = %self.vs_currency,
            price = %fiat_per_unit,
            "Fetched fiat price"
        );

        Ok(PriceQuote {
            asset,
            fiat_per_unit,
            fetched_at: Utc::now(),
        })
    }
}

/// Extract `body[coin_id][vs_currency]` as a positive decimal
fn parse_price(body: &Value, coin_id: &str, vs_currency: &str) -> Result<Decimal> {
    let raw = body
        .get(coin_id)
        .and_then(|coin| coin.get(vs_currency))
        .ok_or_else(|| {
            Error::OracleUnavailable(format!(
                "Price response missing {}.{}",
                coin_id, vs_currency
            ))
        })?;

    // Go through the JSON text so 3000.12 stays 3000.12 rather than its f64 expansion
    let price = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string())),
        Value::String(s) => Decimal::from_str(s),
        other => {
            return Err(Error::OracleUnavailable(format!(
                "Price field is not numeric: {}",
                other
            )))
        }
    }
    .map_err(|e| Error::OracleUnavailable(format!("Unparseable price: {}", e)))?;

    if price <= Decimal::ZERO {
        return Err(Error::OracleUnavailable(format!(
            "Price service reported non-positive price {}",
            price
        )));
    }

    Ok(price)
}
