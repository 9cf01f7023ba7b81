//! DEX aggregator quote providers
//!
//! A quote is executable transaction data for exactly one
//! `(from, to, amount, sender)` tuple. Quotes are ephemeral: two requests with
//! identical arguments may return different routes, and a quote must never be
//! reused for a different amount.
//!
//! SECURITY NOTE:
//! - Providers only fetch calldata, they NEVER sign
//! - The sender address is public; providers have no key access

mod odos;
mod oneinch;

use crate::planner::Amount;
use crate::tokens::AssetId;
use crate::Result;
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

pub use odos::OdosQuoteProvider;
pub use oneinch::OneInchQuoteProvider;

/// Parameters for one quote request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub from: AssetId,
    pub to: AssetId,
    /// In `from`'s base units
    pub amount: Amount,
    /// Address that will originate the swap transaction
    pub sender: Address,
}

/// Executable swap returned by an aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    /// Contract the transaction must call
    pub target_contract: Address,
    pub calldata: Bytes,
    /// Native value to attach, in wei
    pub native_value: U256,
    /// Gas units the aggregator expects the swap to use
    pub gas_estimate: u64,
}

/// Source of executable swap quotes
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch a quote; a single attempt with no retry.
    ///
    /// Network failures and aggregator rejections fail with
    /// `NoRouteAvailable`, undecodable responses with `QuoteMalformed`.
    async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote>;
}
