//! JSON handlers for devices: the user-facing control surface.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use roomhub_app::ports::{EventPublisher, Transport};
use roomhub_app::services::AppliedIntent;
use roomhub_domain::device::{Device, Intent};
use roomhub_domain::error::RoomHubError;
use roomhub_domain::id::{DeviceId, RoomId};
use roomhub_domain::section::Section;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub room: Option<u32>,
}

/// Possible responses from the intent endpoint.
pub enum IntentResponse {
    /// The device snapshot after the transition, and whether the command
    /// was `sent` or `queued`.
    Accepted(Json<AppliedIntent>),
}

impl IntoResponse for IntentResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

fn device_id(room: RoomId, section: &str, name: String) -> Result<DeviceId, ApiError> {
    let section = Section::from_str(section).map_err(RoomHubError::from)?;
    Ok(DeviceId::new(room, section, name))
}

/// `GET /api/devices?room=`
pub async fn list<T, P>(
    State(state): State<AppState<T, P>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Device>>, ApiError>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let room = query
        .room
        .map(RoomId::try_from)
        .transpose()
        .map_err(RoomHubError::from)?;
    Ok(Json(state.control.list_devices(room)))
}

/// `GET /api/devices/{section}/{name}`
pub async fn get<T, P>(
    State(state): State<AppState<T, P>>,
    Path((section, name)): Path<(String, String)>,
) -> Result<Json<Device>, ApiError>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let id = device_id(state.room, &section, name)?;
    Ok(Json(state.control.get_device(&id)?))
}

/// `POST /api/devices/{section}/{name}/intent`
pub async fn apply_intent<T, P>(
    State(state): State<AppState<T, P>>,
    Path((section, name)): Path<(String, String)>,
    Json(intent): Json<Intent>,
) -> Result<IntentResponse, ApiError>
where
    T: Transport + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    let id = device_id(state.room, &section, name)?;
    let applied = state.control.apply_user_intent(&id, intent).await?;
    Ok(IntentResponse::Accepted(Json(applied)))
}
