//! Swap runner
//!
//! One invocation: fetch the native asset's fiat price, size the trade from
//! the budget, then hand it to the [`SwapExecutor`]. Every run gets a fresh
//! run id that tags all of its log lines.

use crate::aggregator::{OdosQuoteProvider, OneInchQuoteProvider, QuoteProvider};
use crate::chain::RpcChainClient;
use crate::config::{AggregatorKind, Config, Secrets};
use crate::executor::{SwapExecutor, SwapReceipt, TransactionDraft};
use crate::oracle::{CoinGeckoOracle, PriceOracle, PriceQuote};
use crate::planner::{Amount, AmountPlanner};
use crate::tokens::{registry, AssetId, NATIVE_ASSET};
use crate::wallet::{SecureWallet, SimulationResult, TransactionSimulator, WalletSigner};
use crate::{Error, Result};
use alloy::primitives::Address;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// How far a run goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Sign and broadcast
    Live,
    /// Quote and build the transaction, then simulate it; nothing is signed
    DryRun,
}

/// What a run produced
#[derive(Debug)]
pub enum RunResult {
    Sent(SwapReceipt),
    DryRun {
        draft: TransactionDraft,
        /// `None` when no node is available to simulate against
        simulation: Option<SimulationResult>,
    },
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub price: PriceQuote,
    pub amount: Amount,
    pub result: RunResult,
}

/// Wires price, planning, and execution for a single swap
pub struct SwapRunner {
    config: Config,
    target: AssetId,
    oracle: Arc<dyn PriceOracle>,
    planner: AmountPlanner,
    executor: SwapExecutor,
    /// Sender address used for simulation
    sender: Address,
    /// Used for the chain check and dry-run simulation
    node: Option<RpcChainClient>,
}

/// Derive the configured wallet; fails when no seed phrase is set
pub fn load_wallet(secrets: &Secrets) -> Result<SecureWallet> {
    let phrase = secrets.seed_phrase.as_ref().ok_or_else(|| {
        Error::Wallet(format!(
            "Environment variable {} not set. Required for wallet initialization.",
            crate::config::env_vars::SEED_PHRASE
        ))
    })?;
    SecureWallet::from_mnemonic(phrase, secrets.wallet_index)
}

impl SwapRunner {
    /// Assemble a runner from its parts
    pub fn new(
        config: Config,
        oracle: Arc<dyn PriceOracle>,
        executor: SwapExecutor,
        sender: Address,
    ) -> Result<Self> {
        config.validate()?;
        let target = config.target_token()?;
        if target.is_native() {
            return Err(Error::Config(
                "target token must differ from the native asset".to_string(),
            ));
        }

        Ok(Self {
            config,
            target,
            oracle,
            planner: AmountPlanner::native(),
            executor,
            sender,
            node: None,
        })
    }

    /// Attach a node for the chain id check and simulation
    pub fn with_node(mut self, node: RpcChainClient) -> Self {
        self.node = Some(node);
        self
    }

    /// Build the production pipeline from configuration and secrets
    pub fn connect(config: Config, secrets: &Secrets) -> Result<Self> {
        config.validate()?;
        let chain_id = config.chain.chain_id;
        let http_timeout = config.timeouts.http();

        let wallet = Arc::new(load_wallet(secrets)?);
        let sender = wallet.address();
        info!(address = %sender, "Loaded wallet from seed phrase");

        let node = RpcChainClient::connect(&secrets.rpc, config.timeouts.rpc())?;
        let chain = Arc::new(node.clone());
        let signer = Arc::new(WalletSigner::new(wallet, chain_id, chain.clone()));

        let quotes: Arc<dyn QuoteProvider> = match config.aggregator.kind {
            AggregatorKind::OneInch => Arc::new(OneInchQuoteProvider::new(
                &config.aggregator.base_url,
                chain_id,
                config.swap.slippage_percent,
                secrets.oneinch_api_key.clone(),
                http_timeout,
            )?),
            AggregatorKind::Odos => Arc::new(OdosQuoteProvider::new(
                chain_id,
                config.swap.slippage_percent,
                http_timeout,
            )?),
        };

        let oracle = Arc::new(CoinGeckoOracle::new(
            &config.oracle,
            NATIVE_ASSET,
            secrets.coingecko_api_key.clone(),
            http_timeout,
        )?);

        let executor = SwapExecutor::new(quotes, signer, chain, config.swap.gas)
            .with_router(config.chain.router);

        Ok(Self::new(config, oracle, executor, sender)?.with_node(node))
    }

    /// Fetch the price and size the trade, without quoting
    pub async fn plan(&self) -> Result<(PriceQuote, Amount)> {
        let price = self.oracle.get_fiat_price(NATIVE_ASSET).await?;
        let amount = self.planner.plan_amount(
            &self.config.budget.range(),
            &price,
            self.config.budget.fraction,
        )?;

        info!(
            price = %price.fiat_per_unit,
            currency = %self.config.oracle.vs_currency,
            min = %self.config.budget.min,
            max = %self.config.budget.max,
            fraction = %self.config.budget.fraction,
            amount_wei = %amount,
            "Planned swap amount"
        );
        Ok((price, amount))
    }

    /// Quote and build a transaction for an explicit amount, without signing
    pub async fn prepare(&self, amount: Amount) -> Result<TransactionDraft> {
        Ok(self
            .executor
            .prepare_swap(NATIVE_ASSET, self.target, amount)
            .await?)
    }

    /// Run the whole pipeline once
    pub async fn run(&self, mode: RunMode) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "swap_run",
            run_id = %run_id,
            chain_id = self.config.chain.chain_id,
            dry_run = mode == RunMode::DryRun
        );
        self.run_inner(run_id, mode).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, mode: RunMode) -> Result<RunReport> {
        let symbol = registry()
            .get(&self.target)
            .map(|info| info.symbol)
            .unwrap_or("unknown");
        info!(target_token = %self.target, symbol, "Starting swap run");
        self.check_chain().await?;

        let (price, amount) = self.plan().await?;

        let result = match mode {
            RunMode::Live => {
                let receipt = self
                    .executor
                    .execute_swap(NATIVE_ASSET, self.target, amount)
                    .await?;
                info!(tx_hash = %receipt.tx_hash, "Swap transaction sent");
                RunResult::Sent(receipt)
            }
            RunMode::DryRun => {
                let draft = self.prepare(amount).await?;
                let simulation = self.simulate(&draft).await;
                info!("Dry run complete; nothing signed");
                RunResult::DryRun { draft, simulation }
            }
        };

        Ok(RunReport {
            run_id,
            price,
            amount,
            result,
        })
    }

    /// Refuse to run against a node serving a different chain
    async fn check_chain(&self) -> Result<()> {
        let Some(node) = &self.node else {
            return Ok(());
        };
        let expected = self.config.chain.chain_id;
        let actual = node.chain_id().await?;
        if actual != expected {
            return Err(Error::Config(format!(
                "RPC endpoint serves chain {} but chain {} is configured",
                actual, expected
            )));
        }
        Ok(())
    }

    async fn simulate(&self, draft: &TransactionDraft) -> Option<SimulationResult> {
        let node = self.node.as_ref()?;
        let simulator =
            TransactionSimulator::new(node.provider().clone(), self.config.timeouts.rpc());
        match simulator.simulate_draft(self.sender, draft).await {
            Ok(result) => {
                if result.success {
                    info!(gas_used = ?result.gas_used, "Simulation succeeded");
                } else {
                    warn!(reason = ?result.revert_reason, "Simulation reverted");
                }
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, "Simulation unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{QuoteRequest, SwapQuote};
    use crate::chain::ChainClient;
    use crate::executor::{GasPolicy, SwapFailure, SwapStage};
    use crate::tokens::addresses;
    use crate::wallet::{SignedTransaction, Signer};
    use alloy::primitives::{Bytes, B256, U256};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct FixedPrice(Option<Decimal>);

    #[async_trait]
    impl PriceOracle for FixedPrice {
        async fn get_fiat_price(&self, asset: AssetId) -> Result<PriceQuote> {
            match self.0 {
                Some(price) => Ok(PriceQuote {
                    asset,
                    fiat_per_unit: price,
                    fetched_at: Utc::now(),
                }),
                None => Err(Error::OracleUnavailable("HTTP 429".to_string())),
            }
        }
    }

    /// Echoes the requested amount as the quote value
    struct EchoQuotes(Mutex<Vec<Amount>>);

    #[async_trait]
    impl QuoteProvider for EchoQuotes {
        async fn get_swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote> {
            self.0.lock().unwrap().push(request.amount);
            Ok(SwapQuote {
                target_contract: addresses::WETH_BASE,
                calldata: Bytes::from(vec![0xde, 0xad]),
                native_value: request.amount.base_units(),
                gas_estimate: 150_000,
            })
        }
    }

    struct StubSigner;

    #[async_trait]
    impl Signer for StubSigner {
        fn address(&self) -> Address {
            Address::repeat_byte(0x11)
        }

        async fn sign(&self, draft: &TransactionDraft) -> Result<SignedTransaction> {
            Ok(SignedTransaction::new(draft.data.clone(), B256::repeat_byte(0x77)))
        }
    }

    struct CountingChain(Mutex<usize>);

    #[async_trait]
    impl ChainClient for CountingChain {
        async fn send_signed(&self, tx: SignedTransaction) -> Result<B256> {
            *self.0.lock().unwrap() += 1;
            Ok(tx.tx_hash())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.chain.target_token = Some(AssetId::new(addresses::USDC_BASE));
        config
    }

    struct Fixture {
        quotes: Arc<EchoQuotes>,
        chain: Arc<CountingChain>,
        runner: SwapRunner,
    }

    fn fixture(price: Option<Decimal>) -> Fixture {
        let quotes = Arc::new(EchoQuotes(Mutex::new(Vec::new())));
        let chain = Arc::new(CountingChain(Mutex::new(0)));
        let executor = SwapExecutor::new(
            quotes.clone(),
            Arc::new(StubSigner),
            chain.clone(),
            GasPolicy::default(),
        );
        let runner = SwapRunner::new(
            config(),
            Arc::new(FixedPrice(price)),
            executor,
            Address::repeat_byte(0x11),
        )
        .unwrap();
        Fixture {
            quotes,
            chain,
            runner,
        }
    }

    #[tokio::test]
    async fn test_live_run_sends_planned_amount() {
        let f = fixture(Some(Decimal::from(3000)));
        let report = f.runner.run(RunMode::Live).await.unwrap();

        let expected = Amount::from_base_units(U256::from(23_333_333_333_333u64));
        assert_eq!(report.amount, expected);
        assert_eq!(f.quotes.0.lock().unwrap().as_slice(), &[expected]);
        assert_eq!(*f.chain.0.lock().unwrap(), 1);
        match report.result {
            RunResult::Sent(receipt) => {
                assert_eq!(receipt.tx_hash, B256::repeat_byte(0x77));
                assert_eq!(receipt.stages.last(), Some(&SwapStage::Confirmed));
            }
            other => panic!("expected a sent swap, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_never_broadcasts() {
        let f = fixture(Some(Decimal::from(3000)));
        let report = f.runner.run(RunMode::DryRun).await.unwrap();

        assert_eq!(*f.chain.0.lock().unwrap(), 0);
        match report.result {
            RunResult::DryRun { draft, simulation } => {
                assert_eq!(draft.value, report.amount.base_units());
                assert!(simulation.is_none());
            }
            other => panic!("expected a dry run, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_stops_before_quoting() {
        let f = fixture(None);
        let err = f.runner.run(RunMode::Live).await.unwrap_err();

        assert!(matches!(err, Error::OracleUnavailable(_)));
        assert!(f.quotes.0.lock().unwrap().is_empty());
        assert_eq!(*f.chain.0.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_price_stops_before_quoting() {
        let f = fixture(Some(Decimal::ZERO));
        let err = f.runner.run(RunMode::Live).await.unwrap_err();

        assert!(matches!(err, Error::InvalidPrice(_)));
        assert!(f.quotes.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_ids_are_unique() {
        let f = fixture(Some(Decimal::from(3000)));
        let first = f.runner.run(RunMode::DryRun).await.unwrap();
        let second = f.runner.run(RunMode::DryRun).await.unwrap();
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_requires_target_token() {
        let executor = SwapExecutor::new(
            Arc::new(EchoQuotes(Mutex::new(Vec::new()))),
            Arc::new(StubSigner),
            Arc::new(CountingChain(Mutex::new(0))),
            GasPolicy::default(),
        );
        let err = SwapRunner::new(
            Config::default(),
            Arc::new(FixedPrice(None)),
            executor,
            Address::ZERO,
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_wallet_requires_seed_phrase() {
        let secrets = Secrets {
            seed_phrase: None,
            wallet_index: 0,
            rpc: crate::config::RpcConfig::with_url(8453, "http://127.0.0.1:9"),
            oneinch_api_key: None,
            coingecko_api_key: None,
        };
        assert!(matches!(load_wallet(&secrets), Err(Error::Wallet(_))));
    }

    #[test]
    fn test_swap_failure_converts_to_error() {
        let failure = SwapFailure {
            stage: SwapStage::QuoteRequested,
            error: Error::NoRouteAvailable("no liquidity".to_string()),
        };
        let err: Error = failure.into();
        assert!(err.to_string().contains("no liquidity"));
    }
}
