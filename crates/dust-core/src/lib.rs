//! Core of the dust aggregator.
//!
//! Turns normalized dust balances into a batch of contract deposits followed by
//! one shared settlement, and exposes the single swap, withdraw and balance
//! operations that run outside a batch. Components are wired together by
//! [`AggregatorBuilder`] from pluggable factories.

pub mod builder;
pub mod engine;
pub mod fees;
pub mod handlers;
pub mod orchestrator;
pub mod retry;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use dust_price::PriceError;
use dust_types::InvocationError;
use state::BatchStateError;
use thiserror::Error;

pub use builder::{AggregatorBuilder, AggregatorFactories, BuilderError};
pub use engine::{event_bus::EventBus, DustAggregator, SwapRequest};
pub use fees::{BatchSummary, FeeSchedule};
pub use orchestrator::{BatchOrchestrator, CancellationFlag};
pub use retry::{settle_with_backoff, settlement_backoff};

/// Errors raised by aggregator operations.
///
/// Per-item deposit failures never surface here; they are recorded in the
/// batch state instead.
#[derive(Debug, Error)]
pub enum AggregatorError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Price error: {0}")]
	Price(#[from] PriceError),
	#[error("Invocation failed: {0}")]
	Invocation(#[from] InvocationError),
	#[error("Invalid state: {0}")]
	InvalidState(String),
}

impl From<BatchStateError> for AggregatorError {
	fn from(err: BatchStateError) -> Self {
		AggregatorError::InvalidState(err.to_string())
	}
}
