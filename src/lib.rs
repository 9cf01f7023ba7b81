//! DeFi Swap Agent
//!
//! Spends a fiat-budgeted amount of a chain's native asset on a target token:
//! - Prices the native asset through a fiat price oracle
//! - Sizes the trade from a min/max fiat budget
//! - Fetches executable calldata from a DEX aggregator (1inch or Odos)
//! - Signs with a seed-phrase wallet and broadcasts a single transaction
//!
//! # Security Model
//!
//! - The seed phrase and derived key never leave the wallet module
//! - Secrets are held in `secrecy` wrappers and never logged
//! - A signed transaction is broadcast at most once; an ambiguous broadcast
//!   is reported with its hash rather than retried

pub mod aggregator;
pub mod chain;
pub mod config;
pub mod executor;
pub mod oracle;
pub mod planner;
pub mod runner;
pub mod tokens;
pub mod wallet;

mod error;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, RpcConfig, Secrets};
pub use error::{Error, Result};
pub use executor::{SwapExecutor, SwapFailure, SwapOutcome, SwapStage};
pub use runner::{RunMode, RunReport, RunResult, SwapRunner};
