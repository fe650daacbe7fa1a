//! Shared application state for axum handlers.

use std::sync::Arc;

use roomhub_app::command_queue::CommandQueue;
use roomhub_app::event_bus::InProcessEventBus;
use roomhub_app::history::MessageHistory;
use roomhub_app::ports::{EventPublisher, Transport};
use roomhub_app::registry::DeviceRegistry;
use roomhub_app::services::ControlService;
use roomhub_domain::id::RoomId;

/// Application state shared across all axum handlers.
///
/// Generic over the transport and event publisher so handlers stay free of
/// dynamic dispatch. `Clone` is implemented manually so only the `Arc`
/// wrappers are cloned.
pub struct AppState<T, P> {
    /// Room served by this process; device paths are relative to it.
    pub room: RoomId,
    pub control: Arc<ControlService<T, P>>,
    pub queue: Arc<CommandQueue<T, P>>,
    pub registry: Arc<DeviceRegistry>,
    pub history: Arc<MessageHistory>,
    pub event_bus: Arc<InProcessEventBus>,
}

impl<T, P> Clone for AppState<T, P> {
    fn clone(&self) -> Self {
        Self {
            room: self.room,
            control: Arc::clone(&self.control),
            queue: Arc::clone(&self.queue),
            registry: Arc::clone(&self.registry),
            history: Arc::clone(&self.history),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<T, P> AppState<T, P>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Build the state around an already running queue.
    ///
    /// The control service is created here from the registry and queue.
    pub fn new(
        room: RoomId,
        registry: Arc<DeviceRegistry>,
        queue: Arc<CommandQueue<T, P>>,
        history: Arc<MessageHistory>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        let control = Arc::new(ControlService::new(
            Arc::clone(&registry),
            Arc::clone(&queue),
        ));
        Self {
            room,
            control,
            queue,
            registry,
            history,
            event_bus,
        }
    }
}
