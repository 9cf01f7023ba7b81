//! Swap execution pipeline
//!
//! One swap walks `Idle → QuoteRequested → TransactionBuilt → Signed →
//! Broadcast → Confirmed`, or drops to `Failed` from any state. Each step
//! completes before the next begins; nothing is retried and nothing is rolled
//! back, since this component never holds funds in escrow.
//!
//! "Confirmed" means the node accepted the raw transaction and returned its
//! hash. Mining is not awaited.

use crate::aggregator::{QuoteProvider, QuoteRequest, SwapQuote};
use crate::chain::ChainClient;
use crate::planner::Amount;
use crate::tokens::AssetId;
use crate::wallet::Signer;
use crate::Error;
use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// 2 gwei
pub const DEFAULT_GAS_PRICE_WEI: u128 = 2_000_000_000;

/// States of a single swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStage {
    Idle,
    QuoteRequested,
    TransactionBuilt,
    Signed,
    Broadcast,
    Confirmed,
    Failed,
}

/// Pinned gas pricing.
///
/// The gas price is a fixed configured value and is never derived from the
/// quote or from current network conditions. The gas limit is the
/// aggregator's estimate, optionally padded by a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPolicy {
    pub gas_price_wei: u128,
    pub gas_limit_buffer_percent: u16,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_price_wei: DEFAULT_GAS_PRICE_WEI,
            gas_limit_buffer_percent: 0,
        }
    }
}

impl GasPolicy {
    /// Gas limit for a quote's estimate, saturating at `u64::MAX`
    pub fn gas_limit(&self, estimate: u64) -> u64 {
        let padded = u128::from(estimate) * (100 + u128::from(self.gas_limit_buffer_percent)) / 100;
        u64::try_from(padded).unwrap_or(u64::MAX)
    }
}

/// Unsigned transaction derived 1:1 from a [`SwapQuote`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDraft {
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub data: Bytes,
}

impl TransactionDraft {
    /// Pure mapping: the same quote and policy always give the same draft
    pub fn from_quote(quote: &SwapQuote, gas: &GasPolicy) -> Self {
        Self {
            to: quote.target_contract,
            value: quote.native_value,
            gas_limit: gas.gas_limit(quote.gas_estimate),
            gas_price: gas.gas_price_wei,
            data: quote.calldata.clone(),
        }
    }
}

/// Successful swap submission
#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub tx_hash: B256,
    pub amount: Amount,
    pub draft: TransactionDraft,
    /// States visited, in order
    pub stages: Vec<SwapStage>,
}

/// What a failed swap may have left on-chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Failed before a signed transaction reached the node
    NothingSent,
    /// The signed transaction was handed to the node but not acknowledged.
    /// It may or may not be in the mempool; do not resubmit blindly.
    BroadcastUnknown { tx_hash: B256 },
}

/// A swap that ended in `Failed`
#[derive(Debug, thiserror::Error)]
#[error("swap failed after reaching {stage:?}: {error}")]
pub struct SwapFailure {
    /// Last state reached before failing
    pub stage: SwapStage,
    #[source]
    pub error: Error,
}

impl SwapFailure {
    pub fn outcome(&self) -> SwapOutcome {
        match &self.error {
            Error::BroadcastFailed { tx_hash, .. } => SwapOutcome::BroadcastUnknown {
                tx_hash: *tx_hash,
            },
            _ => SwapOutcome::NothingSent,
        }
    }
}

/// Records the state walk of one swap
struct SwapRun {
    stages: Vec<SwapStage>,
}

impl SwapRun {
    fn new() -> Self {
        Self {
            stages: vec![SwapStage::Idle],
        }
    }

    fn current(&self) -> SwapStage {
        self.stages.last().copied().unwrap_or(SwapStage::Idle)
    }

    fn advance(&mut self, next: SwapStage) {
        info!(from = ?self.current(), to = ?next, "Swap state transition");
        self.stages.push(next);
    }

    fn fail(&mut self, error: Error) -> SwapFailure {
        let stage = self.current();
        error!(stage = ?stage, error = %error, "Swap failed");
        self.stages.push(SwapStage::Failed);
        SwapFailure { stage, error }
    }
}

/// Orchestrates quote → draft → sign → broadcast for one swap at a time
pub struct SwapExecutor {
    quotes: Arc<dyn QuoteProvider>,
    signer: Arc<dyn Signer>,
    chain: Arc<dyn ChainClient>,
    gas: GasPolicy,
    /// When set, quotes must target this contract
    router: Option<Address>,
    in_flight: Mutex<()>,
}

impl SwapExecutor {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        signer: Arc<dyn Signer>,
        chain: Arc<dyn ChainClient>,
        gas: GasPolicy,
    ) -> Self {
        Self {
            quotes,
            signer,
            chain,
            gas,
            router: None,
            in_flight: Mutex::new(()),
        }
    }

    /// Refuse quotes that call anything but `router`
    pub fn with_router(mut self, router: Option<Address>) -> Self {
        self.router = router;
        self
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.gas
    }

    /// Quote, sign, and broadcast a swap of `amount` of `from` into `to`.
    ///
    /// Concurrent calls are serialized.
    pub async fn execute_swap(
        &self,
        from: AssetId,
        to: AssetId,
        amount: Amount,
    ) -> Result<SwapReceipt, SwapFailure> {
        let _guard = self.in_flight.lock().await;
        let mut run = SwapRun::new();

        let draft = self.build(&mut run, from, to, amount).await?;

        let signed = match self.signer.sign(&draft).await {
            Ok(signed) => signed,
            Err(e) => return Err(run.fail(e)),
        };
        let signed_hash = signed.tx_hash();
        run.advance(SwapStage::Signed);

        // The signed bytes are moved into the client and never resent from here
        let tx_hash = match self.chain.send_signed(signed).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(
                    tx_hash = %signed_hash,
                    "Broadcast failed; transaction may or may not have reached the network"
                );
                return Err(run.fail(e));
            }
        };
        run.advance(SwapStage::Broadcast);
        run.advance(SwapStage::Confirmed);

        info!(tx_hash = %tx_hash, amount = %amount, "Transaction sent");

        Ok(SwapReceipt {
            tx_hash,
            amount,
            draft,
            stages: run.stages,
        })
    }

    /// Stop after `TransactionBuilt`: quote and draft only, nothing signed
    pub async fn prepare_swap(
        &self,
        from: AssetId,
        to: AssetId,
        amount: Amount,
    ) -> Result<TransactionDraft, SwapFailure> {
        let _guard = self.in_flight.lock().await;
        let mut run = SwapRun::new();
        self.build(&mut run, from, to, amount).await
    }

    async fn build(
        &self,
        run: &mut SwapRun,
        from: AssetId,
        to: AssetId,
        amount: Amount,
    ) -> Result<TransactionDraft, SwapFailure> {
        if amount.is_zero() {
            return Err(run.fail(Error::InvalidArgument(
                "swap amount must be positive".to_string(),
            )));
        }
        if from == to {
            return Err(run.fail(Error::InvalidArgument(format!(
                "cannot swap {} into itself",
                from
            ))));
        }

        let request = QuoteRequest {
            from,
            to,
            amount,
            sender: self.signer.address(),
        };
        run.advance(SwapStage::QuoteRequested);

        let quote = match self.quotes.get_swap_quote(&request).await {
            Ok(quote) => quote,
            Err(e) => return Err(run.fail(e)),
        };
        if let Err(e) = self.check_quote(&request, &quote) {
            return Err(run.fail(e));
        }

        let draft = TransactionDraft::from_quote(&quote, &self.gas);
        run.advance(SwapStage::TransactionBuilt);

        info!(
            to = %draft.to,
            value = %draft.value,
            gas_limit = draft.gas_limit,
            gas_price = draft.gas_price,
            data_len = draft.data.len(),
            "Transaction draft built"
        );

        Ok(draft)
    }

    /// Reject quotes that don't match the request they answer
    fn check_quote(&self, request: &QuoteRequest, quote: &SwapQuote) -> crate::Result<()> {
        if let Some(router) = self.router {
            if quote.target_contract != router {
                return Err(Error::QuoteMalformed(format!(
                    "quote targets {} instead of router {}",
                    quote.target_contract, router
                )));
            }
        }

        let expected_value = if request.from.is_native() {
            request.amount.base_units()
        } else {
            U256::ZERO
        };
        if quote.native_value != expected_value {
            return Err(Error::QuoteMalformed(format!(
                "quote value {} does not match expected {}",
                quote.native_value, expected_value
            )));
        }

        if quote.gas_estimate == 0 {
            return Err(Error::QuoteMalformed("quote has zero gas estimate".to_string()));
        }

        Ok(())
    }
}
