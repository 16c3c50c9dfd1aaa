//! Broadcast channel carrying aggregator events to presentation layers.

use dust_types::AggregatorEvent;
use tokio::sync::broadcast;

/// Publishes [`AggregatorEvent`]s to any number of subscribers.
///
/// Subscribers only see events published after they subscribed. A slow
/// subscriber that falls more than `capacity` events behind loses the oldest
/// ones.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<AggregatorEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<AggregatorEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event`. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: AggregatorEvent,
	) -> Result<(), broadcast::error::SendError<AggregatorEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}
