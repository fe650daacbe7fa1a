//! Event bus port: publish/subscribe for domain events.

use std::future::Future;

use roomhub_domain::error::RoomHubError;
use roomhub_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), RoomHubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        (**self).publish(event)
    }
}
