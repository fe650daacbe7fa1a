//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use roomhub_domain::error::RoomHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`RoomHubError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(RoomHubError);

impl From<RoomHubError> for ApiError {
    fn from(err: RoomHubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            RoomHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            RoomHubError::Protocol(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            RoomHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            RoomHubError::Transition(err) => (StatusCode::CONFLICT, err.to_string()),
            RoomHubError::Transport(err) => {
                tracing::error!(error = %err, "transport error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
