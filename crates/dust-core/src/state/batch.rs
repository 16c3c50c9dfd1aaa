//! Batch phase transitions.
//!
//! Phases move along `Idle -> Depositing -> Settling -> Complete`. Settlement
//! failure parks the batch in `PartiallyFailed`, from which settlement may be
//! retried. Cancellation or a settlement policy abort ends it in `Aborted`.

use dust_types::{BatchPhase, BatchState};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchStateError {
	#[error("Invalid batch transition from {from} to {to}")]
	InvalidTransition { from: BatchPhase, to: BatchPhase },
}

static TRANSITIONS: Lazy<HashMap<BatchPhase, HashSet<BatchPhase>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		BatchPhase::Idle,
		// Settling directly for an empty batch.
		HashSet::from([BatchPhase::Depositing, BatchPhase::Settling, BatchPhase::Aborted]),
	);
	m.insert(
		BatchPhase::Depositing,
		HashSet::from([BatchPhase::Settling, BatchPhase::Aborted]),
	);
	m.insert(
		BatchPhase::Settling,
		HashSet::from([BatchPhase::Complete, BatchPhase::PartiallyFailed]),
	);
	m.insert(BatchPhase::PartiallyFailed, HashSet::from([BatchPhase::Settling]));
	m.insert(BatchPhase::Complete, HashSet::new());
	m.insert(BatchPhase::Aborted, HashSet::new());
	m
});

pub fn is_valid_transition(from: BatchPhase, to: BatchPhase) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Moves `state` to `to`, returning the phase it left.
pub fn transition(state: &mut BatchState, to: BatchPhase) -> Result<BatchPhase, BatchStateError> {
	let from = state.phase;
	if !is_valid_transition(from, to) {
		return Err(BatchStateError::InvalidTransition { from, to });
	}
	state.phase = to;
	state.touch();
	Ok(from)
}
