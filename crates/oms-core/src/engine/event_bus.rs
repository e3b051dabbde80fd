//! Broadcast event bus for post-commit events.
//!
//! Services publish after their write has committed; subscribers (the
//! engine's notification dispatcher, primarily) react asynchronously.
//! Publishing to a bus with no subscribers is not an error worth
//! propagating; call sites discard the result.

use tokio::sync::broadcast;

use oms_types::OmsEvent;

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<OmsEvent>,
}

impl EventBus {
	/// Creates a bus retaining up to `capacity` undelivered events per
	/// subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	pub fn publish(&self, event: OmsEvent) -> Result<usize, Box<broadcast::error::SendError<OmsEvent>>> {
		self.sender.send(event).map_err(Box::new)
	}

	/// Registers a new subscriber.
	pub fn subscribe(&self) -> broadcast::Receiver<OmsEvent> {
		self.sender.subscribe()
	}
}
