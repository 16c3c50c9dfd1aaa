//! Batch orchestration.
//!
//! A batch deposits every dust item, then settles once. Items are grouped
//! into lanes by the account that signs them. Lanes run concurrently and each
//! lane submits its items strictly in input order, so one account never has
//! two submissions racing on its sequence number. A failed deposit is
//! recorded against its item and the batch carries on.

use crate::engine::event_bus::EventBus;
use crate::handlers::Invoker;
use crate::state::{transition, BatchStateError};
use crate::AggregatorError;
use dust_account::{AccountService, SignerRegistry};
use dust_types::{
	to_minor_units, truncate_id, AggregatorEvent, BatchEvent, BatchPhase, BatchState,
	DecodedValue, DustItem, FailureKind, FailureReason, InvocationError, OperationArgs, Outcome,
	SettlementPolicy,
};
use futures::future::{join, join_all};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::instrument;

/// Cooperative cancellation for a running batch.
///
/// Checked between items. A deposit already submitted runs to its outcome.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// Items submitted by one account, in input order.
struct Lane {
	signer: Arc<AccountService>,
	items: Vec<(usize, DustItem)>,
}

pub struct BatchOrchestrator {
	invoker: Arc<Invoker>,
	signers: SignerRegistry,
	policy: SettlementPolicy,
	event_bus: EventBus,
}

impl BatchOrchestrator {
	pub fn new(
		invoker: Arc<Invoker>,
		signers: SignerRegistry,
		policy: SettlementPolicy,
		event_bus: EventBus,
	) -> Self {
		Self {
			invoker,
			signers,
			policy,
			event_bus,
		}
	}

	pub fn policy(&self) -> SettlementPolicy {
		self.policy
	}

	/// Deposits `items` and settles the batch.
	///
	/// Never fails: per-item failures are recorded in the returned state and
	/// a settlement failure leaves it `PartiallyFailed`.
	pub async fn run_batch(&self, items: Vec<DustItem>, cancel: &CancellationFlag) -> BatchState {
		let owner = self.signers.settlement_signer().address();
		let mut state = BatchState::new(owner, items);
		if let Err(e) = self.drive(&mut state, cancel).await {
			tracing::error!(error = %e, "Batch stopped on an invalid transition");
		}
		state
	}

	#[instrument(skip_all, fields(batch_id = %truncate_id(&state.id.to_string()), items = state.total()))]
	async fn drive(
		&self,
		state: &mut BatchState,
		cancel: &CancellationFlag,
	) -> Result<(), BatchStateError> {
		tracing::info!("Starting batch");

		if cancel.is_cancelled() {
			return self.abort(state, FailureKind::Cancelled, "Batch cancelled before start");
		}

		if state.total() > 0 {
			self.advance(state, BatchPhase::Depositing)?;
			self.run_deposits(state, cancel).await;

			// A cancel that lands after the last deposit resolved still settles.
			if cancel.is_cancelled() && state.resolved() < state.total() {
				tracing::info!(
					pending = state.total() - state.resolved(),
					"Batch cancelled, skipping settlement"
				);
				return self.abort(state, FailureKind::Cancelled, "Batch cancelled during deposits");
			}
		}

		tracing::info!(
			succeeded = state.succeeded(),
			failed = state.failed(),
			"Deposits resolved"
		);

		if !self.policy.should_settle(state.succeeded()) {
			tracing::warn!("No deposit succeeded, settlement policy aborts the batch");
			return self.abort(state, FailureKind::Aborted, "No deposit succeeded");
		}

		self.advance(state, BatchPhase::Settling)?;
		self.settle(state).await
	}

	/// Re-invokes settlement for a `PartiallyFailed` batch.
	///
	/// Deposits are not resubmitted. Returns the phase the batch ends in.
	#[instrument(skip_all, fields(batch_id = %truncate_id(&state.id.to_string())))]
	pub async fn retry_settlement(&self, state: &mut BatchState) -> Result<BatchPhase, AggregatorError> {
		if state.phase != BatchPhase::PartiallyFailed {
			return Err(AggregatorError::InvalidState(format!(
				"Settlement can only be retried for a partially failed batch, batch is {}",
				state.phase
			)));
		}
		self.advance(state, BatchPhase::Settling)?;
		state.settlement = Outcome::Pending;
		self.settle(state).await?;
		Ok(state.phase)
	}

	async fn run_deposits(&self, state: &mut BatchState, cancel: &CancellationFlag) {
		let mut lanes: BTreeMap<String, Lane> = BTreeMap::new();
		let mut unsigned = Vec::new();
		for (index, item) in state.items.iter().enumerate() {
			match self.signers.signer_for(&item.source_chain) {
				Some(signer) => lanes
					.entry(signer.address())
					.or_insert_with(|| Lane {
						signer,
						items: Vec::new(),
					})
					.items
					.push((index, item.clone())),
				None => unsigned.push((
					index,
					FailureReason::new(
						FailureKind::Signing,
						Some(item.label()),
						format!("No signer registered for chain '{}'", item.source_chain),
					),
				)),
			}
		}

		for (index, reason) in unsigned {
			tracing::warn!(item = %reason.item.as_deref().unwrap_or_default(), "No signer, item skipped");
			self.resolve_item(state, index, Outcome::failed(reason));
		}

		tracing::debug!(lanes = lanes.len(), "Submitting deposits");
		let (tx, mut rx) = mpsc::unbounded_channel();
		let runs = join_all(
			lanes
				.into_values()
				.map(|lane| self.run_lane(lane, tx.clone(), cancel)),
		);
		drop(tx);

		let collect = async {
			while let Some((index, outcome)) = rx.recv().await {
				self.resolve_item(state, index, outcome);
			}
		};
		join(runs, collect).await;
	}

	async fn run_lane(
		&self,
		lane: Lane,
		outcomes: mpsc::UnboundedSender<(usize, Outcome)>,
		cancel: &CancellationFlag,
	) {
		for (index, item) in lane.items {
			if cancel.is_cancelled() {
				tracing::info!(
					account = %truncate_id(&lane.signer.address()),
					"Cancelled, remaining items left pending"
				);
				break;
			}
			let outcome = match self.deposit(&item, &lane.signer).await {
				Ok(value) => {
					tracing::info!(item = %item.label(), "Deposit succeeded");
					Outcome::Succeeded { value }
				},
				Err(e) => {
					tracing::warn!(item = %item.label(), error = %e, "Deposit failed, continuing");
					Outcome::failed(FailureReason::from_invocation(&e, Some(item.label())))
				},
			};
			if outcomes.send((index, outcome)).is_err() {
				break;
			}
		}
	}

	async fn deposit(
		&self,
		item: &DustItem,
		signer: &AccountService,
	) -> Result<DecodedValue, InvocationError> {
		let owner = signer.address();
		// Deposits are recorded under the submitting account. An owner that
		// holds its own settlement-chain address must sign for itself.
		if item.owner_address != owner && self.invoker.is_settlement_address(&item.owner_address) {
			return Err(InvocationError::Signing(format!(
				"Owner {} has no signer, lane account is {}",
				item.owner_address, owner
			)));
		}
		let amount = to_minor_units(item.implied_value)
			.map_err(|e| InvocationError::Encoding(e.to_string()))?;
		let args = OperationArgs::Deposit {
			owner,
			chain: item.source_chain.clone(),
			asset: item.asset_ref.clone(),
			amount,
		};
		self.invoker.invoke(&args, signer).await
	}

	async fn settle(&self, state: &mut BatchState) -> Result<(), BatchStateError> {
		let signer = self.signers.settlement_signer();
		match self.invoker.invoke(&OperationArgs::Settle, &signer).await {
			Ok(value) => {
				state.settlement = Outcome::Succeeded { value };
				state.bump_progress(100);
				tracing::info!("Settlement succeeded");
				self.publish(BatchEvent::SettlementResolved {
					snapshot: state.clone(),
				});
				self.advance(state, BatchPhase::Complete)
			},
			Err(e) => {
				tracing::warn!(error = %e, "Settlement failed");
				state.settlement = Outcome::failed(FailureReason::from_invocation(&e, None));
				state.touch();
				self.publish(BatchEvent::SettlementResolved {
					snapshot: state.clone(),
				});
				self.advance(state, BatchPhase::PartiallyFailed)
			},
		}
	}

	fn abort(
		&self,
		state: &mut BatchState,
		kind: FailureKind,
		cause: &str,
	) -> Result<(), BatchStateError> {
		state.settlement = Outcome::failed(FailureReason::new(kind, None, cause));
		self.advance(state, BatchPhase::Aborted)
	}

	fn resolve_item(&self, state: &mut BatchState, index: usize, outcome: Outcome) {
		state.record_outcome(index, outcome);
		tracing::debug!(
			index,
			resolved = state.resolved(),
			progress = state.progress,
			"Item resolved"
		);
		self.publish(BatchEvent::ItemResolved {
			index,
			snapshot: state.clone(),
		});
	}

	fn advance(&self, state: &mut BatchState, to: BatchPhase) -> Result<(), BatchStateError> {
		let from = transition(state, to)?;
		tracing::info!(from = %from, to = %to, progress = state.progress, "Batch phase changed");
		self.publish(BatchEvent::PhaseChanged {
			from,
			to,
			snapshot: state.clone(),
		});
		Ok(())
	}

	fn publish(&self, event: BatchEvent) {
		// No subscribers is fine.
		self.event_bus.publish(AggregatorEvent::Batch(event)).ok();
	}
}
