//! Fee sharing and batch summaries.
//!
//! These figures are informational. Submitted operations always carry the
//! fixed fee hint from the network configuration.

use dust_types::{total_value, BatchPhase, BatchState};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Fee parameters used for the savings estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
	/// Fixed per-transaction network fee shared across participants.
	pub fixed_fee: Decimal,
	/// Fee one item would pay if submitted on its own.
	pub per_item_fee: Decimal,
	/// Fee of the shared settlement.
	pub batch_fee: Decimal,
}

impl FeeSchedule {
	/// `fixed_fee / max(participants, 2)`, rounded to 3 places.
	pub fn fee_share(&self, participants: usize) -> Decimal {
		(self.fixed_fee / Decimal::from(participants.max(2)))
			.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
	}

	/// `items * per_item_fee - batch_fee`, rounded to 3 places.
	pub fn gas_savings(&self, items: usize) -> Decimal {
		(Decimal::from(items) * self.per_item_fee - self.batch_fee)
			.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
	}
}

/// Report of a finished batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
	pub batch_id: Uuid,
	pub phase: BatchPhase,
	pub progress: u8,
	pub items: usize,
	pub succeeded: usize,
	pub failed: usize,
	pub pending: usize,
	/// Deposits sharing the fixed fee, one per item.
	pub participants: usize,
	/// Distinct owners whose dust is in the batch.
	pub owners: usize,
	/// Value of every item in the batch, rounded to cents.
	pub total_value: Decimal,
	/// Value of the items whose deposit succeeded, rounded to cents.
	pub deposited_value: Decimal,
	pub fee_share: Decimal,
	pub gas_savings: Decimal,
	/// One line per failed item, plus the settlement failure if any.
	pub failures: Vec<String>,
}

fn cents(value: Decimal) -> Decimal {
	value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl BatchSummary {
	pub fn from_state(state: &BatchState, fees: &FeeSchedule) -> Self {
		let owners = state
			.items
			.iter()
			.map(|item| item.owner_address.as_str())
			.collect::<HashSet<_>>()
			.len();

		let mut failures: Vec<String> = state
			.failures()
			.map(|(_, reason)| reason.to_string())
			.collect();
		if let Some(reason) = state.settlement.failure() {
			failures.push(format!("settlement: {}", reason));
		}

		Self {
			batch_id: state.id,
			phase: state.phase,
			progress: state.progress,
			items: state.total(),
			succeeded: state.succeeded(),
			failed: state.failed(),
			pending: state.total() - state.resolved(),
			participants: state.total(),
			owners,
			total_value: cents(total_value(&state.items)),
			deposited_value: cents(state.succeeded_value()),
			fee_share: fees.fee_share(state.total()),
			gas_savings: fees.gas_savings(state.total()),
			failures,
		}
	}
}
