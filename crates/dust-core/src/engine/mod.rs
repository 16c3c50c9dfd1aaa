//! The aggregator facade.
//!
//! [`DustAggregator`] owns the wired components and exposes every operation
//! the binary needs: normalizing balances, running and retrying batches, and
//! the single swap, withdraw and balance invocations that sit outside the
//! batch state machine.

pub mod event_bus;

use crate::fees::{BatchSummary, FeeSchedule};
use crate::handlers::Invoker;
use crate::orchestrator::{BatchOrchestrator, CancellationFlag};
use crate::AggregatorError;
use dust_account::SignerRegistry;
use dust_config::SettlementConfig;
use dust_price::BalanceNormalizer;
use dust_types::{
	to_minor_units, truncate_id, AggregatorEvent, BatchPhase, BatchState, DecodedValue, DustItem,
	FailureReason, InvocationError, OperationArgs, Outcome, RawBalance, SwapEvent,
};
use event_bus::EventBus;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// One swap on the settlement chain, submitted by the settlement account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
	/// Settlement-chain asset to swap from.
	pub from_asset: String,
	/// Settlement-chain asset to swap into.
	pub to_asset: String,
	/// Minor units to swap. `None` lets the contract swap the whole balance.
	pub amount: Option<u64>,
}

pub struct DustAggregator {
	normalizer: BalanceNormalizer,
	orchestrator: Arc<BatchOrchestrator>,
	invoker: Arc<Invoker>,
	signers: SignerRegistry,
	settlement: SettlementConfig,
	fees: FeeSchedule,
	event_bus: EventBus,
}

impl DustAggregator {
	pub fn new(
		normalizer: BalanceNormalizer,
		orchestrator: Arc<BatchOrchestrator>,
		invoker: Arc<Invoker>,
		signers: SignerRegistry,
		settlement: SettlementConfig,
		event_bus: EventBus,
	) -> Self {
		let fees = FeeSchedule {
			fixed_fee: settlement.fixed_fee,
			per_item_fee: settlement.per_item_fee,
			batch_fee: settlement.batch_fee,
		};
		Self {
			normalizer,
			orchestrator,
			invoker,
			signers,
			settlement,
			fees,
			event_bus,
		}
	}

	pub fn orchestrator(&self) -> Arc<BatchOrchestrator> {
		self.orchestrator.clone()
	}

	pub fn fees(&self) -> &FeeSchedule {
		&self.fees
	}

	/// Receives batch and swap events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<AggregatorEvent> {
		self.event_bus.subscribe()
	}

	/// Prices raw balance readings, failing on the first unsupported one.
	pub fn normalize(&self, balances: &[RawBalance]) -> Result<Vec<DustItem>, AggregatorError> {
		Ok(self.normalizer.normalize_all(balances)?)
	}

	pub async fn run_batch(&self, items: Vec<DustItem>, cancel: &CancellationFlag) -> BatchState {
		self.orchestrator.run_batch(items, cancel).await
	}

	pub async fn retry_settlement(
		&self,
		state: &mut BatchState,
	) -> Result<BatchPhase, AggregatorError> {
		self.orchestrator.retry_settlement(state).await
	}

	pub fn summary(&self, state: &BatchState) -> BatchSummary {
		BatchSummary::from_state(state, &self.fees)
	}

	/// Builds a swap from the settlement base asset into the asset registered
	/// under `target` in `settlement.swap_targets`.
	pub fn swap_request(
		&self,
		target: &str,
		amount: Option<u64>,
	) -> Result<SwapRequest, AggregatorError> {
		let to_asset = self.settlement.swap_targets.get(target).ok_or_else(|| {
			AggregatorError::Config(format!("Unknown swap target '{}'", target))
		})?;
		Ok(SwapRequest {
			from_asset: self.settlement.base_asset.clone(),
			to_asset: to_asset.clone(),
			amount,
		})
	}

	/// Swaps on the settlement chain and publishes the outcome.
	///
	/// Failures are returned as a `Failed` outcome rather than an error.
	#[instrument(skip_all, fields(to_asset = %truncate_id(&request.to_asset), amount = ?request.amount))]
	pub async fn swap(&self, request: SwapRequest) -> Outcome {
		let signer = self.signers.settlement_signer();
		let args = OperationArgs::Swap {
			owner: signer.address(),
			from_chain: self.settlement.chain.clone(),
			from_asset: request.from_asset.clone(),
			to_asset: request.to_asset.clone(),
			amount: request.amount,
		};

		let outcome = match self.invoker.invoke(&args, &signer).await {
			Ok(value) => {
				tracing::info!(received = %value, "Swap confirmed");
				Outcome::Succeeded { value }
			},
			Err(e) => {
				tracing::warn!(error = %e, "Swap failed");
				Outcome::failed(FailureReason::from_invocation(
					&e,
					Some(format!("swap to {}", truncate_id(&request.to_asset))),
				))
			},
		};

		self.event_bus
			.publish(AggregatorEvent::Swap(SwapEvent::Resolved {
				to_asset: request.to_asset,
				amount: request.amount,
				outcome: outcome.clone(),
			}))
			.ok();
		outcome
	}

	/// Swaps the value deposited by a completed batch into `target`.
	///
	/// The amount is the sum of the succeeded items' values in minor units.
	pub async fn swap_settled(
		&self,
		batch: &BatchState,
		target: &str,
	) -> Result<Outcome, AggregatorError> {
		if batch.phase != BatchPhase::Complete {
			return Err(AggregatorError::InvalidState(format!(
				"Only a complete batch can be swapped, batch is {}",
				batch.phase
			)));
		}
		let amount = to_minor_units(batch.succeeded_value())
			.map_err(|e| InvocationError::Encoding(e.to_string()))?;
		let request = self.swap_request(target, Some(amount))?;
		Ok(self.swap(request).await)
	}

	/// Withdraws `owner`'s recorded balance of `asset` and returns the amount.
	#[instrument(skip_all, fields(owner = %truncate_id(owner), chain = %chain))]
	pub async fn withdraw(
		&self,
		owner: &str,
		chain: &str,
		asset: &str,
	) -> Result<u64, AggregatorError> {
		let args = OperationArgs::Withdraw {
			owner: owner.to_string(),
			chain: chain.to_string(),
			asset: asset.to_string(),
		};
		let amount = self.invoke_u64(&args).await?;
		tracing::info!(amount, "Withdrawal confirmed");
		Ok(amount)
	}

	/// Reads `owner`'s recorded balance of `asset` without submitting.
	pub async fn get_balance(
		&self,
		owner: &str,
		chain: &str,
		asset: &str,
	) -> Result<u64, AggregatorError> {
		let args = OperationArgs::GetBalance {
			owner: owner.to_string(),
			chain: chain.to_string(),
			asset: asset.to_string(),
		};
		self.invoke_u64(&args).await
	}

	async fn invoke_u64(&self, args: &OperationArgs) -> Result<u64, AggregatorError> {
		let signer = self.signers.settlement_signer();
		match self.invoker.invoke(args, &signer).await? {
			DecodedValue::U64(value) => Ok(value),
			DecodedValue::Void => Err(InvocationError::Decode {
				expected: "u64".to_string(),
				actual: "void".to_string(),
			}
			.into()),
		}
	}
}
