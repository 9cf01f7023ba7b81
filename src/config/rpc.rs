//! RPC endpoint resolution
//!
//! The endpoint for the configured chain is resolved in priority order:
//! 1. Per-chain env var (BASE_RPC_URL, ETH_RPC_URL, ...), then RPC_URL
//! 2. ALCHEMY_API_KEY - builds the provider URL for the chain
//! 3. INFURA_API_KEY - builds the provider URL where Infura serves the chain
//! 4. Public RPC fallback (rate limited, for testing only)
//!
//! Provider URLs embed API keys, so the resolved endpoint is kept secret.

use crate::tokens::chains;
use secrecy::{ExposeSecret, SecretString};

/// Where the endpoint came from (safe to log)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcSource {
    ChainEnv,
    GenericEnv,
    Alchemy,
    Infura,
    Public,
}

/// RPC endpoint for the single configured chain
pub struct RpcConfig {
    chain_id: u64,
    url: Option<SecretString>,
    source: RpcSource,
}

/// Environment variable names
mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const ARBITRUM_RPC_URL: &str = "ARBITRUM_RPC_URL";
    pub const OPTIMISM_RPC_URL: &str = "OPTIMISM_RPC_URL";
    pub const BASE_RPC_URL: &str = "BASE_RPC_URL";
    pub const RPC_URL: &str = "RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const ARBITRUM: &str = "https://arb1.arbitrum.io/rpc";
    pub const OPTIMISM: &str = "https://mainnet.optimism.io";
    pub const BASE: &str = "https://mainnet.base.org";
}

impl RpcConfig {
    /// Resolve the endpoint for `chain_id` from environment variables
    pub fn from_env(chain_id: u64) -> Self {
        Self::resolve(chain_id, |name| {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        })
    }

    /// Use an explicit endpoint
    pub fn with_url(chain_id: u64, url: impl Into<String>) -> Self {
        Self {
            chain_id,
            url: Some(SecretString::from(url.into())),
            source: RpcSource::GenericEnv,
        }
    }

    fn resolve(chain_id: u64, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let found = |url: String, source: RpcSource| Self {
            chain_id,
            url: Some(SecretString::from(url)),
            source,
        };

        let chain_var = match chain_id {
            chains::ETHEREUM => Some(env_vars::ETH_RPC_URL),
            chains::ARBITRUM => Some(env_vars::ARBITRUM_RPC_URL),
            chains::OPTIMISM => Some(env_vars::OPTIMISM_RPC_URL),
            chains::BASE => Some(env_vars::BASE_RPC_URL),
            _ => None,
        };
        if let Some(url) = chain_var.and_then(&lookup) {
            tracing::debug!(chain_id, "Using per-chain RPC URL");
            return found(url, RpcSource::ChainEnv);
        }
        if let Some(url) = lookup(env_vars::RPC_URL) {
            tracing::debug!(chain_id, "Using RPC_URL");
            return found(url, RpcSource::GenericEnv);
        }

        if let Some(key) = lookup(env_vars::ALCHEMY_API_KEY) {
            let network = match chain_id {
                chains::ETHEREUM => Some("eth-mainnet"),
                chains::ARBITRUM => Some("arb-mainnet"),
                chains::OPTIMISM => Some("opt-mainnet"),
                chains::BASE => Some("base-mainnet"),
                _ => None,
            };
            if let Some(network) = network {
                tracing::info!(chain_id, "Building RPC URL from ALCHEMY_API_KEY");
                return found(
                    format!("https://{}.g.alchemy.com/v2/{}", network, key),
                    RpcSource::Alchemy,
                );
            }
        }

        if let Some(key) = lookup(env_vars::INFURA_API_KEY) {
            // Infura doesn't serve Base
            let network = match chain_id {
                chains::ETHEREUM => Some("mainnet"),
                chains::ARBITRUM => Some("arbitrum-mainnet"),
                chains::OPTIMISM => Some("optimism-mainnet"),
                _ => None,
            };
            if let Some(network) = network {
                tracing::info!(chain_id, "Building RPC URL from INFURA_API_KEY");
                return found(
                    format!("https://{}.infura.io/v3/{}", network, key),
                    RpcSource::Infura,
                );
            }
        }

        let public = match chain_id {
            chains::ETHEREUM => Some(public_rpcs::ETHEREUM),
            chains::ARBITRUM => Some(public_rpcs::ARBITRUM),
            chains::OPTIMISM => Some(public_rpcs::OPTIMISM),
            chains::BASE => Some(public_rpcs::BASE),
            _ => None,
        };
        if public.is_some() {
            tracing::warn!(chain_id, "No RPC configured, using public RPC (rate limited)");
        }
        Self {
            chain_id,
            url: public.map(|url| SecretString::from(url.to_string())),
            source: RpcSource::Public,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn source(&self) -> RpcSource {
        self.source
    }

    /// The endpoint URL; exposes any embedded API key, so never log it
    pub fn url(&self) -> Option<&str> {
        self.url.as_ref().map(|url| url.expose_secret())
    }
}

impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig")
            .field("chain_id", &self.chain_id)
            .field("source", &self.source)
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
