//! Asset identifiers and token metadata
//!
//! Assets are identified by their contract address. The chain's native asset
//! uses the aggregator sentinel address rather than a real contract.

use crate::{Error, Result};
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Decimals of the native asset (wei per ether)
pub const NATIVE_DECIMALS: u8 = 18;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
}

/// Well-known addresses
pub mod addresses {
    use super::*;

    /// Sentinel used by aggregators for the chain's native asset
    pub const NATIVE_SENTINEL: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
    pub const ZERO_ADDRESS: Address = address!("0000000000000000000000000000000000000000");

    // === Base ===
    pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");
    pub const DAI_BASE: Address = address!("50c5725949a6f0c72e6c4a641f24049a917db0cb");
    pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
}

/// Opaque token identifier on the configured chain.
///
/// Parsing accepts any hex casing; two identifiers are equal iff their
/// addresses are byte-equal, which is the same as comparing lowercased forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Address);

impl AssetId {
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn is_native(&self) -> bool {
        self.0 == addresses::NATIVE_SENTINEL
    }

    /// Canonical lowercase hex form, as sent to aggregators
    pub fn canonical(&self) -> String {
        format!("0x{}", alloy::hex::encode(self.0))
    }
}

/// The chain's native asset
pub const NATIVE_ASSET: AssetId = AssetId::new(addresses::NATIVE_SENTINEL);

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Lowercasing sidesteps EIP-55 checksum validation on mixed-case input
        Address::from_str(&s.trim().to_lowercase())
            .map(Self)
            .map_err(|e| Error::InvalidArgument(format!("Invalid asset address '{}': {}", s, e)))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<Address> for AssetId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

/// Token metadata
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    /// Token symbol (e.g., "USDC", "WETH")
    pub symbol: &'static str,
    /// Number of decimals
    pub decimals: u8,
}

/// Token registry providing decimals lookups
pub struct TokenRegistry {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        use addresses::*;

        let mut tokens = HashMap::new();
        tokens.insert(
            NATIVE_SENTINEL,
            TokenInfo {
                symbol: "ETH",
                decimals: NATIVE_DECIMALS,
            },
        );
        tokens.insert(
            USDC_BASE,
            TokenInfo {
                symbol: "USDC",
                decimals: 6,
            },
        );
        tokens.insert(
            DAI_BASE,
            TokenInfo {
                symbol: "DAI",
                decimals: 18,
            },
        );
        tokens.insert(
            WETH_BASE,
            TokenInfo {
                symbol: "WETH",
                decimals: 18,
            },
        );

        Self { tokens }
    }

    pub fn get(&self, asset: &AssetId) -> Option<&TokenInfo> {
        self.tokens.get(&asset.address())
    }

    /// Decimal precision of an asset, if known
    pub fn decimals_of(&self, asset: &AssetId) -> Option<u8> {
        self.get(asset).map(|info| info.decimals)
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<TokenRegistry> = std::sync::OnceLock::new();

/// Get the global token registry
pub fn registry() -> &'static TokenRegistry {
    REGISTRY.get_or_init(TokenRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_equality_ignores_case() {
        let checksummed: AssetId = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE".parse().unwrap();
        let lower: AssetId = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee".parse().unwrap();
        assert_eq!(checksummed, lower);
        assert!(checksummed.is_native());
        assert_eq!(checksummed, NATIVE_ASSET);
    }

    #[test]
    fn test_canonical_is_lowercase() {
        let usdc = AssetId::new(addresses::USDC_BASE);
        assert_eq!(
            usdc.canonical(),
            "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"
        );
    }

    #[test]
    fn test_rejects_invalid_address() {
        assert!(matches!(
            "0x1234".parse::<AssetId>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!("not-an-address".parse::<AssetId>().is_err());
    }

    #[test]
    fn test_native_decimals() {
        assert_eq!(registry().decimals_of(&NATIVE_ASSET), Some(NATIVE_DECIMALS));
        assert_eq!(
            registry().decimals_of(&AssetId::new(addresses::USDC_BASE)),
            Some(6)
        );
        assert_eq!(
            registry().decimals_of(&AssetId::new(addresses::ZERO_ADDRESS)),
            None
        );
    }
}
