//! Configuration for the swap agent
//!
//! Non-secret settings come from an optional JSON file. Secrets and
//! deployment-specific addresses come from the environment; see
//! [`Secrets::from_env`] and [`Config::apply_env`].

pub mod rpc;

use crate::executor::GasPolicy;
use crate::planner::FiatBudget;
use crate::tokens::{chains, AssetId};
use crate::{Error, Result};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub use rpc::RpcConfig;

/// Environment variable names
pub mod env_vars {
    pub const SEED_PHRASE: &str = "SEED_PHRASE";
    pub const WALLET_INDEX: &str = "WALLET_INDEX";
    pub const TARGET_TOKEN_ADDRESS: &str = "TARGET_TOKEN_ADDRESS";
    pub const ROUTER_ADDRESS: &str = "ROUTER_ADDRESS";
    pub const ONEINCH_API_KEY: &str = "ONEINCH_API_KEY";
    pub const COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
}

/// Largest slippage tolerance accepted from configuration
const MAX_SLIPPAGE_PERCENT: u8 = 50;

/// Chain and asset addressing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Token bought with the native asset
    pub target_token: Option<AssetId>,
    /// Aggregator router; when set, quotes targeting any other contract are refused
    pub router: Option<Address>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: chains::BASE,
            target_token: None,
            router: None,
        }
    }
}

/// Fiat budget and where within it to land
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Fiat floor
    pub min: Decimal,
    /// Fiat ceiling
    pub max: Decimal,
    /// 0 buys at the floor of the budget, 1 at the ceiling
    pub fraction: Decimal,
}

impl BudgetConfig {
    pub fn range(&self) -> FiatBudget {
        FiatBudget {
            min: self.min,
            max: self.max,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            min: Decimal::new(6, 2),
            max: Decimal::new(8, 2),
            fraction: Decimal::new(5, 1),
        }
    }
}

/// Swap execution policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapPolicy {
    /// Slippage tolerance in whole percent
    pub slippage_percent: u8,
    pub gas: GasPolicy,
}

impl Default for SwapPolicy {
    fn default() -> Self {
        Self {
            slippage_percent: 1,
            gas: GasPolicy::default(),
        }
    }
}

/// Price oracle endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub coin_id: String,
    pub vs_currency: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            coin_id: "ethereum".to_string(),
            vs_currency: "usd".to_string(),
        }
    }
}

/// Supported aggregator backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregatorKind {
    #[default]
    OneInch,
    Odos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub kind: AggregatorKind,
    /// Base URL for the 1inch swap API; the chain id is appended
    pub base_url: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            kind: AggregatorKind::OneInch,
            base_url: "https://api.1inch.io/v5.0".to_string(),
        }
    }
}

/// Per-call network timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub http_ms: u64,
    pub rpc_ms: u64,
}

impl TimeoutConfig {
    pub fn http(&self) -> Duration {
        Duration::from_millis(self.http_ms)
    }

    pub fn rpc(&self) -> Duration {
        Duration::from_millis(self.rpc_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            http_ms: 10_000,
            rpc_ms: 20_000,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub budget: BudgetConfig,
    pub swap: SwapPolicy,
    pub oracle: OracleConfig,
    pub aggregator: AggregatorConfig,
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overlay addresses supplied through the environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(token) = lookup(env_vars::TARGET_TOKEN_ADDRESS) {
            self.chain.target_token = Some(token.parse()?);
        }
        if let Some(router) = lookup(env_vars::ROUTER_ADDRESS) {
            let router = Address::from_str(&router.trim().to_lowercase()).map_err(|e| {
                Error::Config(format!("{} is not an address: {}", env_vars::ROUTER_ADDRESS, e))
            })?;
            self.chain.router = Some(router);
        }
        Ok(())
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.budget.range().validate()?;

        if self.budget.fraction < Decimal::ZERO || self.budget.fraction > Decimal::ONE {
            return Err(Error::Config(format!(
                "budget.fraction must be within [0, 1], got {}",
                self.budget.fraction
            )));
        }
        if self.swap.slippage_percent == 0 || self.swap.slippage_percent > MAX_SLIPPAGE_PERCENT {
            return Err(Error::Config(format!(
                "swap.slippage_percent must be within 1..={}, got {}",
                MAX_SLIPPAGE_PERCENT, self.swap.slippage_percent
            )));
        }
        if self.swap.gas.gas_price_wei == 0 {
            return Err(Error::Config("swap.gas.gas_price_wei must be positive".to_string()));
        }
        if self.timeouts.http_ms == 0 || self.timeouts.rpc_ms == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    /// The configured target token, required for anything that trades
    pub fn target_token(&self) -> Result<AssetId> {
        self.chain.target_token.ok_or_else(|| {
            Error::Config(format!(
                "No target token configured (set chain.target_token or {})",
                env_vars::TARGET_TOKEN_ADDRESS
            ))
        })
    }
}

/// Secret material resolved once at startup.
///
/// Never serialized and never logged.
pub struct Secrets {
    pub seed_phrase: Option<SecretString>,
    pub wallet_index: u32,
    pub rpc: RpcConfig,
    pub oneinch_api_key: Option<SecretString>,
    pub coingecko_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env(chain_id: u64) -> Result<Self> {
        let secret = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        let wallet_index = match std::env::var(env_vars::WALLET_INDEX) {
            Ok(raw) => raw.trim().parse().map_err(|e| {
                Error::Config(format!("{} must be an integer: {}", env_vars::WALLET_INDEX, e))
            })?,
            Err(_) => 0,
        };

        Ok(Self {
            seed_phrase: secret(env_vars::SEED_PHRASE),
            wallet_index,
            rpc: RpcConfig::from_env(chain_id),
            oneinch_api_key: secret(env_vars::ONEINCH_API_KEY),
            coingecko_api_key: secret(env_vars::COINGECKO_API_KEY),
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("seed_phrase", &self.seed_phrase.as_ref().map(|_| "[REDACTED]"))
            .field("wallet_index", &self.wallet_index)
            .field("rpc", &self.rpc)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::addresses;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.chain.chain_id, chains::BASE);
        assert_eq!(config.swap.slippage_percent, 1);
        assert_eq!(config.swap.gas.gas_price_wei, 2_000_000_000);
        assert!(config.target_token().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let value = serde_json::json!({
            "chain": {
                "target_token": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"
            },
            "budget": { "min": "1.50", "max": 2, "fraction": 0.25 }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");

        assert_eq!(parsed.chain.chain_id, chains::BASE);
        assert_eq!(
            parsed.target_token().unwrap(),
            AssetId::new(addresses::USDC_BASE)
        );
        assert_eq!(parsed.budget.min, Decimal::new(150, 2));
        assert_eq!(parsed.budget.max, Decimal::from(2));
        assert_eq!(parsed.budget.fraction, Decimal::new(25, 2));
        assert_eq!(parsed.aggregator.kind, AggregatorKind::OneInch);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_partial_budget_keeps_default_bounds() {
        let value = serde_json::json!({ "budget": { "fraction": 0.25 } });
        let parsed: Config = serde_json::from_value(value).expect("parse config");

        let defaults = BudgetConfig::default();
        assert_eq!(parsed.budget.min, defaults.min);
        assert_eq!(parsed.budget.max, defaults.max);
        assert_eq!(parsed.budget.fraction, Decimal::new(25, 2));
        parsed.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "aggregator": {{ "kind": "odos" }}, "swap": {{ "slippage_percent": 2 }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.aggregator.kind, AggregatorKind::Odos);
        assert_eq!(config.swap.slippage_percent, 2);
        assert_eq!(config.swap.gas, GasPolicy::default());
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/swap-agent.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.budget.min = Decimal::from(5);
        config.budget.max = Decimal::from(1);
        assert!(matches!(config.validate(), Err(Error::InvalidBudget(_))));

        let mut config = Config::default();
        config.budget.fraction = Decimal::from(2);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.swap.slippage_percent = 0;
        assert!(config.validate().is_err());
        config.swap.slippage_percent = 51;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.swap.gas.gas_price_wei = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (
                env_vars::TARGET_TOKEN_ADDRESS,
                "0x4200000000000000000000000000000000000006",
            ),
            (
                env_vars::ROUTER_ADDRESS,
                "0x1111111254EEB25477B68fb85Ed929f73A960582",
            ),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.target_token().unwrap(),
            AssetId::new(addresses::WETH_BASE)
        );
        assert_eq!(
            config.chain.router.unwrap().to_string().to_lowercase(),
            "0x1111111254eeb25477b68fb85ed929f73a960582"
        );
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| {
                (name == env_vars::ROUTER_ADDRESS).then(|| "0xnope".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
