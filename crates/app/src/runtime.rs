//! Background loops that connect the transport, router, queue and event bus.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use roomhub_domain::event::{Event, EventType};
use roomhub_domain::id::RoomId;

use crate::command_queue::CommandQueue;
use crate::ports::{EventPublisher, Transport, TransportEvent};
use crate::registry::DeviceRegistry;
use crate::router::InboundRouter;

/// Consumes transport notifications: messages go to the router, connection
/// changes go to the command queue.
pub struct InboundLoop<T, P> {
    room: RoomId,
    router: InboundRouter<P>,
    queue: Arc<CommandQueue<T, P>>,
    publisher: P,
}

impl<T, P> InboundLoop<T, P>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn start(
        room: RoomId,
        events: mpsc::Receiver<TransportEvent>,
        router: InboundRouter<P>,
        queue: Arc<CommandQueue<T, P>>,
        publisher: P,
    ) -> JoinHandle<()> {
        let inbound = Self {
            room,
            router,
            queue,
            publisher,
        };
        tokio::spawn(inbound.run(events))
    }

    async fn run(self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Message { topic, payload } => {
                    let outcome = self.router.route(self.room, &payload).await;
                    tracing::trace!(%topic, ?outcome, "inbound message routed");
                }
                TransportEvent::Connected => self.connection_changed(true).await,
                TransportEvent::Disconnected => self.connection_changed(false).await,
            }
        }
        tracing::info!("transport event stream closed");
    }

    async fn connection_changed(&self, connected: bool) {
        if connected {
            tracing::info!(room = %self.room, "controller connection established");
        } else {
            tracing::info!(room = %self.room, "controller connection lost, pausing command queue");
        }
        self.queue.notify_connection(connected);
        let event = Event::new(
            EventType::ConnectionChanged,
            None,
            serde_json::json!({ "connected": connected }),
        );
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish connection event");
        }
    }
}

/// Republish every registry change as a [`EventType::DeviceUpdated`] event.
pub fn spawn_change_forwarder<P>(registry: &DeviceRegistry, publisher: P) -> JoinHandle<()>
where
    P: EventPublisher + Send + Sync + 'static,
{
    let mut changes = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    let data = match serde_json::to_value(&change) {
                        Ok(data) => data,
                        Err(err) => {
                            tracing::warn!(%err, "failed to serialize device change");
                            continue;
                        }
                    };
                    let event =
                        Event::new(EventType::DeviceUpdated, Some(change.device.id), data);
                    if let Err(err) = publisher.publish(event).await {
                        tracing::warn!(%err, "failed to publish device change");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change forwarder lagged, some changes were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
