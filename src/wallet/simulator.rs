//! Dry-run simulation of transaction drafts
//!
//! Uses `eth_call` against the latest block to catch reverts before anything
//! is signed, then `eth_estimateGas` for comparison with the aggregator's
//! estimate.
//!
//! SECURITY NOTE:
//! - This module is read-only - it never signs or submits transactions
//! - Simulation uses the wallet's public address only

use crate::executor::TransactionDraft;
use crate::{Error, Result};
use alloy::hex;
use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// `Error(string)` selector
const ERROR_STRING_SELECTOR: &str = "08c379a0";

/// Result of simulating a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub success: bool,
    /// Node's gas estimate (if the call succeeded)
    pub gas_used: Option<u64>,
    pub revert_reason: Option<String>,
}

impl SimulationResult {
    pub fn success(gas_used: Option<u64>) -> Self {
        Self {
            success: true,
            gas_used,
            revert_reason: None,
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            success: false,
            gas_used: None,
            revert_reason: Some(reason),
        }
    }
}

/// Transaction simulator using eth_call
pub struct TransactionSimulator {
    provider: RootProvider,
    timeout: Duration,
}

impl TransactionSimulator {
    pub fn new(provider: RootProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Simulate `draft` as if sent from `from`
    ///
    /// A revert is a successful simulation with `success == false`; only an
    /// unresponsive node is an error.
    pub async fn simulate_draft(
        &self,
        from: Address,
        draft: &TransactionDraft,
    ) -> Result<SimulationResult> {
        let tx = TransactionRequest::default()
            .from(from)
            .to(draft.to)
            .input(draft.data.clone().into())
            .value(draft.value)
            .gas_limit(draft.gas_limit)
            .gas_price(draft.gas_price);

        let call = tokio::time::timeout(self.timeout, self.provider.call(tx.clone()))
            .await
            .map_err(|_| self.timed_out("eth_call"))?;

        if let Err(e) = call {
            let reason = parse_revert_reason(&e.to_string());
            debug!(reason = %reason, "Simulation reverted");
            return Ok(SimulationResult::failed(reason));
        }

        let gas_used = tokio::time::timeout(self.timeout, self.provider.estimate_gas(tx))
            .await
            .map_err(|_| self.timed_out("eth_estimateGas"))?
            .ok();

        Ok(SimulationResult::success(gas_used))
    }

    fn timed_out(&self, method: &str) -> Error {
        Error::Simulation(format!(
            "{} did not respond within {}ms",
            method,
            self.timeout.as_millis()
        ))
    }
}

/// Best-effort revert reason from an RPC error message
fn parse_revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + "revert: ".len()..];
        return reason.split('"').next().unwrap_or(reason).to_string();
    }

    if let Some(start) = error.find("0x") {
        let data: String = error[start + 2..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        if let Some(message) = decode_error_string(&data) {
            return message;
        }
        if !data.is_empty() {
            return format!("Reverted with data: 0x{}", data);
        }
    }

    "execution reverted".to_string()
}

/// Decode ABI-encoded `Error(string)` revert data (hex without `0x`)
fn decode_error_string(data: &str) -> Option<String> {
    let body = data.strip_prefix(ERROR_STRING_SELECTOR)?;
    let bytes = hex::decode(body).ok()?;
    // offset word, length word, then the string
    let len_word = bytes.get(32..64)?;
    let len = usize::try_from(u64::from_be_bytes(len_word[24..32].try_into().ok()?)).ok()?;
    let end = 64usize.checked_add(len)?;
    let message = bytes.get(64..end)?;
    String::from_utf8(message.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_result_constructors() {
        let ok = SimulationResult::success(Some(150_000));
        assert!(ok.success);
        assert_eq!(ok.gas_used, Some(150_000));
        assert!(ok.revert_reason.is_none());

        let failed = SimulationResult::failed("insufficient balance".to_string());
        assert!(!failed.success);
        assert!(failed.gas_used.is_none());
        assert_eq!(failed.revert_reason.as_deref(), Some("insufficient balance"));
    }

    #[test]
    fn test_parse_revert_reason() {
        assert_eq!(
            parse_revert_reason("execution reverted: revert: Return amount is not enough\""),
            "Return amount is not enough"
        );
        assert_eq!(parse_revert_reason("execution reverted"), "execution reverted");
        assert_eq!(parse_revert_reason("connection refused"), "connection refused");
        assert_eq!(
            parse_revert_reason("execution reverted, data: \"0xdeadbeef\""),
            "Reverted with data: 0xdeadbeef"
        );
    }

    #[test]
    fn test_decode_error_string() {
        // Error("Min return not reached")
        let data = concat!(
            "08c379a0",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000016",
            "4d696e2072657475726e206e6f74207265616368656400000000000000000000"
        );
        assert_eq!(
            decode_error_string(data).as_deref(),
            Some("Min return not reached")
        );
        assert_eq!(
            parse_revert_reason(&format!("execution reverted: 0x{}", data)),
            "Min return not reached"
        );
        assert!(decode_error_string("deadbeef").is_none());
    }

    #[test]
    fn test_decode_error_string_rejects_oversized_length() {
        let data = concat!(
            "08c379a0",
            "0000000000000000000000000000000000000000000000000000000000000020",
            "000000000000000000000000000000000000000000000000ffffffffffffffff",
            "4d696e2072657475726e206e6f74207265616368656400000000000000000000"
        );
        assert!(decode_error_string(data).is_none());
        assert_eq!(
            parse_revert_reason(&format!("execution reverted: 0x{}", data)),
            format!("Reverted with data: 0x{}", data)
        );
    }
}
