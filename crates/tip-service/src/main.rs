//! Main entry point for the tip settlement service.
//!
//! The `tipper` binary loads a configuration file, connects the wallet for
//! the chosen source chain and settles one tip to a streamer, printing the
//! execution result as JSON.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tip_config::Config;
use tip_core::{SettleOptions, TipForm, TipTarget};
use tip_types::{Asset, GasTier};

mod wiring;

/// Command-line arguments for the tip service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Send one tip
	Send(SendArgs),
	/// List supported chains
	Chains,
}

#[derive(clap::Args, Debug)]
struct SendArgs {
	/// Source chain id
	#[arg(long)]
	chain: u64,

	/// Token address on the source chain; defaults to the native asset
	#[arg(long)]
	token: Option<String>,

	/// Token symbol, required with --token
	#[arg(long, requires = "token")]
	symbol: Option<String>,

	/// Token decimals, required with --token
	#[arg(long, requires = "token")]
	decimals: Option<u8>,

	/// Amount in display units, e.g. "0.01"
	#[arg(long)]
	amount: String,

	/// Streamer's payout address
	#[arg(long)]
	recipient: String,

	/// Destination chain id; defaults to the configured settlement chain
	#[arg(long)]
	destination_chain: Option<u64>,

	#[arg(long)]
	streamer: String,

	#[arg(long, default_value = "")]
	message: String,

	/// Display name shown with the tip
	#[arg(long)]
	name: Option<String>,

	/// Maximum slippage as a fraction, overriding the config
	#[arg(long)]
	slippage: Option<Decimal>,

	/// Gas tier for EVM chains (auto, fast, instant)
	#[arg(long)]
	gas_tier: Option<GasTier>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", args.config.display());

	match args.command {
		Command::Chains => list_chains(&config),
		Command::Send(send) => send_tip(&config, send).await,
	}
}

fn list_chains(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
	let registry = config.registry()?;
	let mut chains: Vec<_> = registry.chains().collect();
	chains.sort_by_key(|c| c.id);
	for chain in chains {
		println!(
			"{:>18}  {:<4} {:<12} {:<8} {}",
			chain.id,
			chain.key,
			chain.name,
			chain.family.to_string(),
			chain.native.symbol
		);
	}
	Ok(())
}

async fn send_tip(config: &Config, send: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
	let registry = Arc::new(config.registry()?);
	let chain = registry.describe(send.chain)?.clone();

	let asset = match send.token {
		Some(address) => Asset {
			address,
			symbol: send.symbol.ok_or("--symbol is required with --token")?,
			decimals: send.decimals.ok_or("--decimals is required with --token")?,
		},
		None => Asset {
			address: chain.native.address.clone(),
			symbol: chain.native.symbol.clone(),
			decimals: chain.native.decimals,
		},
	};

	let executor = wiring::build_executor(config, &chain).await?;
	let sender = executor.wallet().current_address()?;
	let engine = wiring::build_engine(config, registry, executor)?;
	let ledger = wiring::build_ledger(config)?;

	let mut form = TipForm::new(
		Arc::new(engine),
		ledger,
		TipTarget {
			streamer_id: send.streamer,
			recipient_address: send.recipient,
			destination_chain_id: send.destination_chain.unwrap_or(config.settlement.chain_id),
		},
	);
	form.source_chain_id = Some(chain.id);
	form.asset = Some(asset);
	form.amount = send.amount;
	form.message = send.message;
	form.display_name = send.name;

	let options = SettleOptions {
		slippage: send.slippage,
		gas_tier: send.gas_tier,
	};
	let on_status = |status: &str| tracing::info!(status, "Progress");

	let outcome = match form.submit(&sender, &options, &on_status).await {
		Ok(outcome) => outcome,
		Err(e) => {
			tracing::error!(error = %e, "Tip failed");
			return Err(form.error().unwrap_or("Tip failed").into());
		},
	};

	println!("{}", serde_json::to_string_pretty(&outcome.result)?);

	// Let the ledger notification finish before the runtime shuts down
	if let Some(ledger) = outcome.ledger {
		if let Err(e) = ledger.await {
			tracing::warn!(error = %e, "Ledger task did not complete");
		}
	}
	Ok(())
}
