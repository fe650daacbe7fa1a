//! Command queue inspection.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use roomhub_app::command_queue::QueueStatus;
use roomhub_app::ports::{EventPublisher, Transport};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub dropped: usize,
}

/// `GET /api/queue`
pub async fn status<T, P>(State(state): State<AppState<T, P>>) -> Json<QueueStatus>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Json(state.queue.status())
}

/// `DELETE /api/queue`: drop every pending command.
pub async fn clear<T, P>(State(state): State<AppState<T, P>>) -> Json<Cleared>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let dropped = state.queue.clear().await;
    tracing::info!(dropped, "command queue cleared");
    Json(Cleared { dropped })
}
