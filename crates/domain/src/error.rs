//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RoomHubError`] when crossing a port boundary.

use std::error::Error;

use crate::device::{DeviceKind, MomentaryPhase};

/// Top-level error returned by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum RoomHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("protocol error")]
    Protocol(#[from] ProtocolError),

    #[error("transition rejected")]
    Transition(#[from] TransitionError),

    /// Failure reported by the transport collaborator (broker, socket, ...).
    #[error("transport error")]
    Transport(#[source] Box<dyn Error + Send + Sync>),
}

/// Domain invariant violations detected while building devices or layouts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("room number must be at least 1")]
    InvalidRoom,

    #[error("temperature range {min}..={max} is empty")]
    TemperatureRange { min: f64, max: f64 },

    #[error("momentary timings {execution_ms}ms/{cooldown_ms}ms skip a phase: execution must exceed the {press_ms}ms press, cooldown must be positive")]
    MomentaryTiming {
        execution_ms: u64,
        cooldown_ms: u64,
        press_ms: u64,
    },

    #[error("unknown device kind {0:?}")]
    UnknownKind(String),

    #[error("device {0} is declared twice")]
    DuplicateDevice(String),
}

/// A lookup that did not match anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Malformed inbound wire message, or an unknown wire token.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown locale {0:?}")]
    UnknownLocale(String),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("invalid room number {0}")]
    InvalidRoom(String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message is not valid JSON")]
    Json(#[source] serde_json::Error),
}

/// A state machine refused the requested transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("momentary action is busy ({phase})")]
    Busy { phase: MomentaryPhase },

    #[error("{intent} is not supported by {kind} devices")]
    UnsupportedIntent {
        kind: DeviceKind,
        intent: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_format_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "12/bedroom/Totale".to_string(),
        };
        assert_eq!(err.to_string(), "Device 12/bedroom/Totale not found");
    }

    #[test]
    fn should_wrap_protocol_error_into_roomhub_error() {
        let err: RoomHubError = ProtocolError::MissingField("sNome").into();
        assert!(matches!(
            err,
            RoomHubError::Protocol(ProtocolError::MissingField("sNome"))
        ));
    }

    #[test]
    fn should_expose_source_of_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ProtocolError::Json(json_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn should_describe_busy_phase() {
        let err = TransitionError::Busy {
            phase: MomentaryPhase::Executing,
        };
        assert_eq!(err.to_string(), "momentary action is busy (executing)");
    }
}
