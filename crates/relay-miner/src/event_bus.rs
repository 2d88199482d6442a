//! Typed pub/sub handle shared by the relay services.

use relay_types::RelayEvent;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Fan-out channel for [`RelayEvent`]s.
///
/// Delivery is lossy by design: a round's output batch is only worth
/// delivering to whoever is listening right now, and a block tick that
/// nobody consumes has no value later. Publishing to an empty bus is
/// therefore not an error; the event is dropped with a log line and the
/// matcher keeps running. Dropping a receiver unsubscribes it, and
/// handlers that must not run concurrently process their receiver from a
/// single task.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
		self.sender.subscribe()
	}

	/// Hands the event to every current subscriber and reports how many
	/// there were.
	pub fn publish(&self, event: RelayEvent) -> usize {
		let topic = event.topic();
		match self.sender.send(event) {
			Ok(receivers) => {
				trace!(topic, receivers, "event published");
				receivers
			}
			Err(broadcast::error::SendError(_)) => {
				debug!(topic, "event dropped, no subscribers");
				0
			}
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}
