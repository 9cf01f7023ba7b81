//! DeFi Swap Agent CLI
//!
//! Command-line interface for the fiat-budgeted swap pipeline.

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use defi_swap_agent::planner::Amount;
use defi_swap_agent::runner::load_wallet;
use defi_swap_agent::{
    Config, Error, Result, RunMode, RunResult, Secrets, SwapOutcome, SwapRunner,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "swap-agent")]
#[command(about = "Swap a fiat budget of the native asset into a target token")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price, plan, quote, sign, and broadcast one swap
    Swap {
        /// Stop before signing and simulate the transaction instead
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the planned amount at the current price
    Plan,

    /// Fetch a quote and build the transaction for an explicit amount
    Quote {
        /// Amount of the native asset in wei
        #[arg(long)]
        amount: String,
    },

    /// Show the wallet address derived from SEED_PHRASE
    Address,

    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;

    match cli.command {
        Commands::Swap { dry_run } => run_swap(config, dry_run).await?,
        Commands::Plan => run_plan(config).await?,
        Commands::Quote { amount } => run_quote(config, &amount).await?,
        Commands::Address => {
            let secrets = Secrets::from_env(config.chain.chain_id)?;
            let wallet = load_wallet(&secrets)?;
            println!("{}", wallet.address());
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_swap(config: Config, dry_run: bool) -> Result<()> {
    let secrets = Secrets::from_env(config.chain.chain_id)?;
    let runner = SwapRunner::connect(config, &secrets)?;
    let mode = if dry_run {
        RunMode::DryRun
    } else {
        RunMode::Live
    };

    let report = match runner.run(mode).await {
        Ok(report) => report,
        Err(Error::Swap(failure)) => {
            if let SwapOutcome::BroadcastUnknown { tx_hash } = failure.outcome() {
                tracing::error!(
                    tx_hash = %tx_hash,
                    "Broadcast outcome unknown; check the hash on-chain before retrying"
                );
            }
            return Err(Error::Swap(failure));
        }
        Err(e) => return Err(e),
    };

    match report.result {
        RunResult::Sent(receipt) => {
            println!("Transaction sent: {}", receipt.tx_hash);
        }
        RunResult::DryRun { draft, simulation } => {
            println!("{}", serde_json::to_string_pretty(&draft)?);
            match simulation {
                Some(result) if result.success => {
                    println!("Simulation SUCCEEDED");
                    if let Some(gas) = result.gas_used {
                        println!("  Gas used: {}", gas);
                    }
                }
                Some(result) => {
                    println!("Simulation FAILED");
                    if let Some(reason) = result.revert_reason {
                        println!("  Revert reason: {}", reason);
                    }
                }
                None => println!("Simulation skipped"),
            }
        }
    }

    Ok(())
}

async fn run_plan(config: Config) -> Result<()> {
    let secrets = Secrets::from_env(config.chain.chain_id)?;
    let runner = SwapRunner::connect(config, &secrets)?;
    let (price, amount) = runner.plan().await?;

    println!("Price: {}", price.fiat_per_unit);
    println!("Amount (wei): {}", amount);
    Ok(())
}

async fn run_quote(config: Config, amount: &str) -> Result<()> {
    let units = U256::from_str_radix(amount.trim(), 10)
        .map_err(|e| Error::InvalidArgument(format!("Invalid amount {}: {}", amount, e)))?;

    let secrets = Secrets::from_env(config.chain.chain_id)?;
    let runner = SwapRunner::connect(config, &secrets)?;
    let draft = runner.prepare(Amount::from_base_units(units)).await?;

    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}
