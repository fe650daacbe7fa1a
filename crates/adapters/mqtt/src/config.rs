//! MQTT connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the controller broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Topic the controller publishes state on.
    pub subscribe_topic: String,
    /// Topic commands are published on.
    pub publish_topic: String,
    /// Quality of service for both directions, 0 to 2.
    pub qos: u8,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Pause between two reconnection attempts, in seconds.
    pub reconnect_delay_secs: u64,
    /// Consecutive failed attempts before the transport gives up.
    pub max_reconnect_attempts: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "roomhub".to_string(),
            subscribe_topic: "Camere/Plc".to_string(),
            publish_topic: "Camere/Hmi".to_string(),
            qos: 1,
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 5,
        }
    }
}

impl MqttConfig {
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "roomhub");
        assert_eq!(config.subscribe_topic, "Camere/Plc");
        assert_eq!(config.publish_topic, "Camere/Hmi");
        assert_eq!(config.qos, 1);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "plc.local"
            broker_port = 8883
            client_id = "room-12"
            subscribe_topic = "Plc/Out"
            publish_topic = "Plc/In"
            qos = 2
            keep_alive_secs = 60
            reconnect_delay_secs = 1
            max_reconnect_attempts = 10
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "plc.local");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "room-12");
        assert_eq!(config.subscribe_topic, "Plc/Out");
        assert_eq!(config.publish_topic, "Plc/In");
        assert_eq!(config.qos, 2);
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.max_reconnect_attempts, 10);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let toml = r#"broker_host = "192.168.1.100""#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.client_id, "roomhub");
    }
}
