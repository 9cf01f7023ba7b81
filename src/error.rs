//! Error types for the swap agent

use crate::executor::SwapFailure;
use alloy::primitives::B256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Invalid budget: {0}")]
    InvalidBudget(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("No route available: {0}")]
    NoRouteAvailable(String),

    #[error("Malformed swap quote: {0}")]
    QuoteMalformed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// The node rejected or never acknowledged the raw transaction.
    ///
    /// The transaction was signed, so it may still have reached the mempool.
    #[error("Broadcast of {tx_hash} failed: {reason}")]
    BroadcastFailed { tx_hash: B256, reason: String },

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Swap(Box<SwapFailure>),
}

impl From<SwapFailure> for Error {
    fn from(failure: SwapFailure) -> Self {
        Error::Swap(Box::new(failure))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
