//! Main entry point for the dust aggregator.
//!
//! Loads configuration, wires the aggregator from the registered
//! implementations and runs one command: a deposit-and-settle batch over a
//! file of balance readings, a swap, a withdrawal or a balance query.

use clap::{Args, Parser, Subcommand};
use dust_config::Config;
use dust_core::{settle_with_backoff, settlement_backoff, CancellationFlag, DustAggregator};
use dust_types::{to_minor_units, AggregatorEvent, BatchPhase, RawBalance};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

mod factory_registry;

use factory_registry::build_aggregator_from_config;

/// Command-line arguments for the dust aggregator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
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
	/// Deposit every balance in a JSON file and settle the batch
	Batch {
		/// JSON array of balance readings
		#[arg(long)]
		balances: PathBuf,

		/// Keep retrying a failed settlement for up to this many seconds
		#[arg(long)]
		settle_retry_secs: Option<u64>,

		/// Swap the deposited value into this target once settled
		#[arg(long)]
		swap_to: Option<String>,
	},
	/// Swap on the settlement chain
	Swap {
		/// Target symbol from `settlement.swap_targets`
		#[arg(long)]
		to: String,

		/// USD amount to swap; the whole balance when omitted
		#[arg(long)]
		amount: Option<Decimal>,

		/// Asset to swap from; defaults to `settlement.base_asset`
		#[arg(long)]
		from_asset: Option<String>,
	},
	/// Withdraw a recorded balance
	Withdraw(AssetArgs),
	/// Query a recorded balance without submitting
	Balance(AssetArgs),
}

#[derive(Args, Debug)]
struct AssetArgs {
	#[arg(long)]
	owner: String,
	#[arg(long)]
	chain: String,
	#[arg(long)]
	asset: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Cli::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.aggregator.id);

	let aggregator = build_aggregator_from_config(config)?;

	match args.command {
		Command::Batch {
			balances,
			settle_retry_secs,
			swap_to,
		} => run_batch(&aggregator, balances, settle_retry_secs, swap_to).await?,
		Command::Swap {
			to,
			amount,
			from_asset,
		} => {
			let amount = amount.map(to_minor_units).transpose()?;
			let mut request = aggregator.swap_request(&to, amount)?;
			if let Some(from_asset) = from_asset {
				request.from_asset = from_asset;
			}
			let outcome = aggregator.swap(request).await;
			println!("{}", serde_json::to_string_pretty(&outcome)?);
		},
		Command::Withdraw(asset) => {
			let amount = aggregator
				.withdraw(&asset.owner, &asset.chain, &asset.asset)
				.await?;
			println!("{}", amount);
		},
		Command::Balance(asset) => {
			let balance = aggregator
				.get_balance(&asset.owner, &asset.chain, &asset.asset)
				.await?;
			println!("{}", balance);
		},
	}

	Ok(())
}

async fn run_batch(
	aggregator: &DustAggregator,
	balances: PathBuf,
	settle_retry_secs: Option<u64>,
	swap_to: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
	let contents = tokio::fs::read_to_string(&balances).await?;
	let readings: Vec<RawBalance> = serde_json::from_str(&contents)?;
	let items = aggregator.normalize(&readings)?;
	tracing::info!(count = items.len(), "Normalized balances");

	let cancel = CancellationFlag::new();
	let interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("Interrupted, stopping after in-flight deposits");
			interrupt.cancel();
		}
	});

	let mut events = aggregator.subscribe();
	let progress = tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(AggregatorEvent::Batch(event)) => {
					let snapshot = event.snapshot();
					tracing::info!(
						phase = %snapshot.phase,
						progress = snapshot.progress,
						resolved = snapshot.resolved(),
						total = snapshot.total(),
						"Batch progress"
					);
				},
				Ok(AggregatorEvent::Swap(_)) => {},
				Err(RecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "Progress listener lagged");
				},
				Err(RecvError::Closed) => break,
			}
		}
	});

	let mut state = aggregator.run_batch(items, &cancel).await;

	if state.phase == BatchPhase::PartiallyFailed {
		if let Some(secs) = settle_retry_secs {
			let backoff = settlement_backoff(Duration::from_secs(secs));
			settle_with_backoff(&aggregator.orchestrator(), &mut state, backoff).await?;
		}
	}

	if let Some(target) = swap_to {
		if state.phase == BatchPhase::Complete {
			let outcome = aggregator.swap_settled(&state, &target).await?;
			println!("{}", serde_json::to_string_pretty(&outcome)?);
		} else {
			tracing::warn!(phase = %state.phase, "Batch did not complete, skipping swap");
		}
	}

	progress.abort();
	println!(
		"{}",
		serde_json::to_string_pretty(&aggregator.summary(&state))?
	);
	Ok(())
}
