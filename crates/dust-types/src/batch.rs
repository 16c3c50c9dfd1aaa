//! Batch state and per-item outcomes.
//!
//! A [`BatchState`] is owned and mutated by the orchestrator only. Everyone
//! else observes clones published as events. Outcomes are kept aligned with
//! items by index, and failed items keep their reason until the batch is
//! dropped.

use crate::{current_timestamp, DecodedValue, DustItem, InvocationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Share of the progress bar reserved for the deposit phase.
pub const DEPOSIT_PROGRESS_CAP: u8 = 50;

/// Which pipeline stage an item or settlement failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	UnsupportedAsset,
	Encoding,
	Signing,
	Submission,
	Timeout,
	Decode,
	/// The run was cancelled before this step started.
	Cancelled,
	/// Settlement skipped by the configured policy.
	Aborted,
}

impl fmt::Display for FailureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			FailureKind::UnsupportedAsset => "unsupported_asset",
			FailureKind::Encoding => "encoding",
			FailureKind::Signing => "signing",
			FailureKind::Submission => "submission",
			FailureKind::Timeout => "timeout",
			FailureKind::Decode => "decode",
			FailureKind::Cancelled => "cancelled",
			FailureKind::Aborted => "aborted",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
	pub kind: FailureKind,
	/// Label of the failing item, if the failure belongs to one.
	pub item: Option<String>,
	pub cause: String,
}

impl FailureReason {
	pub fn new(kind: FailureKind, item: Option<String>, cause: impl Into<String>) -> Self {
		Self {
			kind,
			item,
			cause: cause.into(),
		}
	}

	/// Builds a reason from an invocation error.
	pub fn from_invocation(error: &InvocationError, item: Option<String>) -> Self {
		Self::new(error.kind(), item, error.to_string())
	}
}

impl fmt::Display for FailureReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.item {
			Some(item) => write!(f, "[{}] {}: {}", self.kind, item, self.cause),
			None => write!(f, "[{}] {}", self.kind, self.cause),
		}
	}
}

/// Terminal or pending result of one remote step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
	#[default]
	Pending,
	Succeeded { value: DecodedValue },
	Failed { reason: FailureReason },
}

impl Outcome {
	pub fn failed(reason: FailureReason) -> Self {
		Outcome::Failed { reason }
	}

	pub fn is_pending(&self) -> bool {
		matches!(self, Outcome::Pending)
	}

	pub fn is_succeeded(&self) -> bool {
		matches!(self, Outcome::Succeeded { .. })
	}

	pub fn is_failed(&self) -> bool {
		matches!(self, Outcome::Failed { .. })
	}

	pub fn failure(&self) -> Option<&FailureReason> {
		match self {
			Outcome::Failed { reason } => Some(reason),
			_ => None,
		}
	}
}

impl From<Result<DecodedValue, FailureReason>> for Outcome {
	fn from(result: Result<DecodedValue, FailureReason>) -> Self {
		match result {
			Ok(value) => Outcome::Succeeded { value },
			Err(reason) => Outcome::Failed { reason },
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
	Idle,
	Depositing,
	Settling,
	Complete,
	/// Deposits resolved but settlement failed. Settlement may be retried.
	PartiallyFailed,
	Aborted,
}

impl BatchPhase {
	/// Whether the run has stopped. `PartiallyFailed` counts as stopped even
	/// though settlement can be retried from it.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			BatchPhase::Complete | BatchPhase::PartiallyFailed | BatchPhase::Aborted
		)
	}
}

impl fmt::Display for BatchPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BatchPhase::Idle => "idle",
			BatchPhase::Depositing => "depositing",
			BatchPhase::Settling => "settling",
			BatchPhase::Complete => "complete",
			BatchPhase::PartiallyFailed => "partially_failed",
			BatchPhase::Aborted => "aborted",
		};
		f.write_str(name)
	}
}

/// What to do when no deposit of a batch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
	/// Settle regardless. The contract settles whatever it already recorded.
	#[default]
	Always,
	/// Abort the batch instead of settling.
	RequireDeposit,
}

impl SettlementPolicy {
	pub fn should_settle(&self, succeeded_deposits: usize) -> bool {
		match self {
			SettlementPolicy::Always => true,
			SettlementPolicy::RequireDeposit => succeeded_deposits > 0,
		}
	}
}

/// Progress and outcomes of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
	pub id: Uuid,
	/// Address of the settlement account that owns the batch.
	pub owner: String,
	pub phase: BatchPhase,
	pub items: Vec<DustItem>,
	/// One outcome per item, same order as `items`.
	pub outcomes: Vec<Outcome>,
	pub settlement: Outcome,
	/// Percent complete. Never decreases.
	pub progress: u8,
	pub created_at: u64,
	pub updated_at: u64,
}

impl BatchState {
	pub fn new(owner: impl Into<String>, items: Vec<DustItem>) -> Self {
		let now = current_timestamp();
		Self {
			id: Uuid::new_v4(),
			owner: owner.into(),
			phase: BatchPhase::Idle,
			outcomes: vec![Outcome::Pending; items.len()],
			items,
			settlement: Outcome::Pending,
			progress: 0,
			created_at: now,
			updated_at: now,
		}
	}

	pub fn total(&self) -> usize {
		self.items.len()
	}

	/// Number of items whose deposit has a terminal outcome.
	pub fn resolved(&self) -> usize {
		self.outcomes.iter().filter(|o| !o.is_pending()).count()
	}

	pub fn succeeded(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_succeeded()).count()
	}

	pub fn failed(&self) -> usize {
		self.outcomes.iter().filter(|o| o.is_failed()).count()
	}

	/// Items whose deposit failed, with their reasons.
	pub fn failures(&self) -> impl Iterator<Item = (&DustItem, &FailureReason)> {
		self.items
			.iter()
			.zip(&self.outcomes)
			.filter_map(|(item, outcome)| outcome.failure().map(|reason| (item, reason)))
	}

	/// Total implied value of items whose deposit succeeded.
	pub fn succeeded_value(&self) -> Decimal {
		crate::total_value(
			self.items
				.iter()
				.zip(&self.outcomes)
				.filter(|(_, outcome)| outcome.is_succeeded())
				.map(|(item, _)| item),
		)
	}

	/// Records the deposit outcome for `index` and advances progress.
	///
	/// Progress becomes `max(progress, floor(resolved * 50 / total))`, so
	/// failed items advance it just like successful ones.
	pub fn record_outcome(&mut self, index: usize, outcome: Outcome) {
		if let Some(slot) = self.outcomes.get_mut(index) {
			*slot = outcome;
		}
		let total = self.total();
		if total > 0 {
			let step = self.resolved() * DEPOSIT_PROGRESS_CAP as usize / total;
			self.bump_progress(step.min(DEPOSIT_PROGRESS_CAP as usize) as u8);
		}
		self.touch();
	}

	/// Raises progress to at least `value`, capped at 100.
	pub fn bump_progress(&mut self, value: u8) {
		self.progress = self.progress.max(value.min(100));
	}

	pub fn touch(&mut self) {
		self.updated_at = current_timestamp();
	}

	/// A batch is finished once it was aborted, or once every item and the
	/// settlement have a terminal outcome.
	pub fn is_terminal(&self) -> bool {
		self.phase == BatchPhase::Aborted
			|| (self.resolved() == self.total() && !self.settlement.is_pending())
	}
}
