//! pumplaunch - queue-driven pump.fun token launch service
//!
//! Subcommands cover the queued creation flow (`create`) and the direct
//! flows (`snipe`, `sell`, `transfer`, `collect`) that run synchronously in
//! the invoking context.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![warn(unused_must_use)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pumplaunch::config::{ImageBlob, LaunchConfig};
use pumplaunch::launcher::{LaunchOrchestrator, SnipeSet};
use pumplaunch::metadata::IpfsUploader;
use pumplaunch::queue::{JobQueue, JobState};
use pumplaunch::rpc::{JitoRelay, SolanaRpc};
use pumplaunch::submitter::Submitter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "launch.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enqueue a token creation and wait for its terminal state
    Create,
    /// Create the token and buy in from the configured snipe wallets
    /// as one atomic bundle
    Launch,
    /// Buy into an existing token from the configured snipe wallets
    Snipe {
        /// Mint address of the token
        mint: String,
    },
    /// Sell the funding wallet's holding, keeping a one-token reserve
    Sell {
        /// Mint address of the token
        mint: String,
    },
    /// Transfer SOL from the funding wallet
    Transfer {
        /// Destination address
        to: String,
        /// Amount in SOL
        amount: f64,
    },
    /// Sweep the snipe wallets' balances into one destination
    Collect {
        /// Destination address
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = LaunchConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    info!(rpc = %config.rpc_url, "Starting pumplaunch");

    let rpc = Arc::new(SolanaRpc::new(config.rpc_url.clone()));
    let relay = Arc::new(JitoRelay::new());
    let submitter = Submitter::new(rpc.clone(), relay);
    let orchestrator = LaunchOrchestrator::new(rpc, submitter);

    match args.command {
        Command::Create => run_create(config, orchestrator).await,
        Command::Launch => run_launch(config, orchestrator).await,
        Command::Snipe { mint } => {
            let mint = parse_pubkey(&mint)?;
            let snipe = SnipeSet::resolve(&config.snipe.wallets, &config.snipe.amounts_sol)?;
            let bundle_id = orchestrator
                .snipe(
                    mint,
                    &snipe,
                    config.slippage_bps,
                    config.priority_fee,
                    config.tip_sol,
                    config.snipe.region,
                )
                .await?;
            info!(%bundle_id, "Snipe submitted");
            Ok(())
        }
        Command::Sell { mint } => {
            let mint = parse_pubkey(&mint)?;
            let outcome = orchestrator
                .sell(&config.wallet, mint, config.slippage_bps, config.priority_fee)
                .await?;
            info!(?outcome, "Sell finished");
            Ok(())
        }
        Command::Transfer { to, amount } => {
            let to = parse_pubkey(&to)?;
            let bundle_id = orchestrator
                .transfer(
                    &config.wallet,
                    to,
                    amount,
                    config.priority_fee,
                    config.tip_sol,
                    config.snipe.region,
                )
                .await?;
            info!(%bundle_id, "Transfer submitted");
            Ok(())
        }
        Command::Collect { to } => {
            let to = parse_pubkey(&to)?;
            let bundle_id = orchestrator
                .collect(
                    &config.snipe.wallets,
                    to,
                    config.priority_fee,
                    config.tip_sol,
                    config.snipe.region,
                )
                .await?;
            info!(%bundle_id, "Collect submitted");
            Ok(())
        }
    }
}

/// Queued creation: enqueue, run the worker, report the terminal state
async fn run_create(config: LaunchConfig, orchestrator: LaunchOrchestrator) -> Result<()> {
    let image = read_image(&config.image_path).await?;
    let request = config.into_request(image);

    let (queue, worker) = JobQueue::new(orchestrator, Arc::new(IpfsUploader));
    let handle = queue.enqueue(request)?;
    let worker_task = tokio::spawn(worker.run());

    let job = queue
        .wait_terminal(handle.id)
        .await
        .ok_or_else(|| anyhow!("job {} disappeared", handle.id))?;
    match &job.state {
        JobState::Completed(outcome) => info!(job_id = job.id, ?outcome, "Job completed"),
        JobState::Failed(message) => error!(job_id = job.id, %message, "Job failed"),
        state => error!(job_id = job.id, ?state, "Unexpected non-terminal state"),
    }

    drop(queue);
    worker_task.await.context("worker task panicked")?;
    Ok(())
}

/// Direct create-and-snipe bundle (no queue involved)
async fn run_launch(config: LaunchConfig, orchestrator: LaunchOrchestrator) -> Result<()> {
    let image = read_image(&config.image_path).await?;
    let snipe = SnipeSet::resolve(&config.snipe.wallets, &config.snipe.amounts_sol)?;
    let region = config.snipe.region;
    let request = config.into_request(image);

    let metadata_uri =
        pumplaunch::metadata::upload_metadata(&request.metadata, &request.image).await?;
    let outcome = orchestrator
        .create_and_snipe(&request, &metadata_uri, &snipe, region)
        .await?;
    info!(?outcome, "Launch finished");
    Ok(())
}

async fn read_image(path: &str) -> Result<ImageBlob> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image file: {path}"))?;
    let mime_type = match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(ImageBlob {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

fn parse_pubkey(raw: &str) -> Result<Pubkey> {
    Pubkey::from_str(raw).with_context(|| format!("invalid address: {raw}"))
}

/// Initialize tracing with an env-filter, verbose flag lowering the floor
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    Ok(())
}
