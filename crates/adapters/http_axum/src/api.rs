//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod messages;
pub mod queue;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use roomhub_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<T, P>() -> Router<AppState<T, P>>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Router::new()
        // Devices
        .route("/devices", get(devices::list::<T, P>))
        .route("/devices/{section}/{name}", get(devices::get::<T, P>))
        .route(
            "/devices/{section}/{name}/intent",
            post(devices::apply_intent::<T, P>),
        )
        // Delivery
        .route(
            "/queue",
            get(queue::status::<T, P>).delete(queue::clear::<T, P>),
        )
        // Controller traffic
        .route(
            "/messages",
            get(messages::list::<T, P>).delete(messages::clear::<T, P>),
        )
        .route("/messages/stats", get(messages::stats::<T, P>))
        // Live streams
        .route("/stream", get(sse::device_changes::<T, P>))
        .route("/events/stream", get(sse::events::<T, P>))
}
