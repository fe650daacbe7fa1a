//! Inbound message history and statistics.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use roomhub_app::history::{HistoryEntry, HistoryStatistics};
use roomhub_app::ports::{EventPublisher, Transport};
use roomhub_domain::error::RoomHubError;
use roomhub_domain::id::RoomId;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub kind: Option<String>,
    pub room: Option<u32>,
}

/// `GET /api/messages?kind=&room=`
pub async fn list<T, P>(
    State(state): State<AppState<T, P>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let room = query
        .room
        .map(RoomId::try_from)
        .transpose()
        .map_err(RoomHubError::from)?;
    Ok(Json(state.history.entries(query.kind.as_deref(), room)))
}

/// `GET /api/messages/stats`
pub async fn stats<T, P>(State(state): State<AppState<T, P>>) -> Json<HistoryStatistics>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    Json(state.history.statistics())
}

/// `DELETE /api/messages`
pub async fn clear<T, P>(State(state): State<AppState<T, P>>) -> StatusCode
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    state.history.clear();
    StatusCode::NO_CONTENT
}
