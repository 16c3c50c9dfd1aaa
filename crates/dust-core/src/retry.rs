//! Caller-level settlement retry.
//!
//! The orchestrator settles once per call. Callers that want to keep trying a
//! partially failed batch wrap it in an exponential backoff here.

use crate::orchestrator::BatchOrchestrator;
use crate::AggregatorError;
use backoff::{backoff::Backoff, ExponentialBackoff};
use dust_types::{truncate_id, BatchPhase, BatchState};
use std::time::Duration;

/// Exponential backoff that gives up after `max_elapsed`.
pub fn settlement_backoff(max_elapsed: Duration) -> ExponentialBackoff {
	ExponentialBackoff {
		max_elapsed_time: Some(max_elapsed),
		..Default::default()
	}
}

/// Retries settlement of a `PartiallyFailed` batch until it completes or the
/// backoff is exhausted. Returns the phase the batch ends in.
///
/// A batch in any other phase is returned untouched.
pub async fn settle_with_backoff(
	orchestrator: &BatchOrchestrator,
	state: &mut BatchState,
	mut backoff: ExponentialBackoff,
) -> Result<BatchPhase, AggregatorError> {
	let batch_id = truncate_id(&state.id.to_string());
	let mut attempts = 0u32;

	while state.phase == BatchPhase::PartiallyFailed {
		let Some(delay) = backoff.next_backoff() else {
			tracing::warn!(
				batch_id = %batch_id,
				attempts,
				"Settlement retries exhausted"
			);
			break;
		};
		attempts += 1;
		tracing::info!(
			batch_id = %batch_id,
			attempt = attempts,
			delay_ms = delay.as_millis() as u64,
			"Retrying settlement"
		);
		tokio::time::sleep(delay).await;
		orchestrator.retry_settlement(state).await?;
	}

	Ok(state.phase)
}
