//! Events published to presentation layers.
//!
//! Batch events carry a full [`BatchState`] snapshot so a subscriber can
//! render per-item and aggregate progress without tracking history.

use crate::{BatchPhase, BatchState, Outcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AggregatorEvent {
	Batch(BatchEvent),
	Swap(SwapEvent),
}

/// Snapshots emitted while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
	/// The batch moved to a new phase.
	PhaseChanged {
		from: BatchPhase,
		to: BatchPhase,
		snapshot: BatchState,
	},
	/// A deposit reached a terminal outcome.
	ItemResolved { index: usize, snapshot: BatchState },
	/// The settlement invocation resolved.
	SettlementResolved { snapshot: BatchState },
}

impl BatchEvent {
	pub fn snapshot(&self) -> &BatchState {
		match self {
			BatchEvent::PhaseChanged { snapshot, .. }
			| BatchEvent::ItemResolved { snapshot, .. }
			| BatchEvent::SettlementResolved { snapshot } => snapshot,
		}
	}
}

/// Result of a caller-initiated swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwapEvent {
	Resolved {
		to_asset: String,
		amount: Option<u64>,
		outcome: Outcome,
	},
}
