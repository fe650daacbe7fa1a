//! MQTT adapter error types.

use roomhub_domain::error::RoomHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The broker connection is down, or `connect` was never called.
    #[error("MQTT client not connected")]
    NotConnected,

    /// `connect` was called a second time.
    #[error("MQTT client already started")]
    AlreadyStarted,

    /// The configured quality of service is not 0, 1 or 2.
    #[error("invalid MQTT QoS level {0}")]
    InvalidQos(u8),

    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for RoomHubError {
    fn from(err: MqttError) -> Self {
        Self::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_connected_error() {
        let err = MqttError::NotConnected;
        assert_eq!(err.to_string(), "MQTT client not connected");
    }

    #[test]
    fn should_convert_to_transport_error() {
        let err: RoomHubError = MqttError::InvalidQos(3).into();
        assert!(matches!(err, RoomHubError::Transport(_)));
    }
}
