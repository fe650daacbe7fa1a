//! Fan-out of application events to in-process observers.

use std::future::Future;

use tokio::sync::broadcast;

use roomhub_domain::error::RoomHubError;
use roomhub_domain::event::Event;

use crate::ports::EventPublisher;

/// Broadcast hub for queue, connection and rejection events.
///
/// Observers that fall behind by more than `capacity` events see a lag
/// error on their receiver. Publishing never waits on them.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event_type = ?event.event_type, "no observer for event");
        }
        async { Ok(()) }
    }
}
