//! Server-Sent Events (SSE) streams for live clients.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use roomhub_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

fn frames<S, V>(source: S) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = Result<V, BroadcastStreamRecvError>>,
    V: Serialize,
{
    source.filter_map(|result| match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => Some(Ok(Event::default().data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize SSE frame");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some frames were dropped");
            None
        }
    })
}

/// `GET /api/stream`: every device change, as it happens.
///
/// Each frame is a JSON `DeviceChange` (device snapshot plus origin). This
/// is what a renderer subscribes to.
pub async fn device_changes<T, P>(
    State(state): State<AppState<T, P>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let changes = BroadcastStream::new(state.registry.subscribe());
    Sse::new(frames(changes)).keep_alive(KeepAlive::default())
}

/// `GET /api/events/stream`: delivery, connection and rejection events.
pub async fn events<T, P>(
    State(state): State<AppState<T, P>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let events = BroadcastStream::new(state.event_bus.subscribe());
    Sse::new(frames(events)).keep_alive(KeepAlive::default())
}
