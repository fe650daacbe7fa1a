//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `roomhub.toml` in the working directory, or the file named by
//! `ROOMHUB_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use roomhub_adapter_mqtt::MqttConfig;
use roomhub_app::command_queue::{
    DEFAULT_MAX_PENDING, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, QueueConfig,
};
use roomhub_domain::id::RoomId;
use roomhub_domain::layout::{BathroomKind, DeviceSpec, standard_layout};

const DEFAULT_PATH: &str = "roomhub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Controller broker connection.
    pub mqtt: MqttConfig,
    /// Outbound command delivery.
    pub queue: QueueSettings,
    /// The room this instance controls.
    pub room: RoomConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_pending: usize,
}

/// Room identity and device set.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Room number, matched against `nCamera`.
    pub number: u32,
    /// Whether the room has a living area.
    pub living: bool,
    pub bathroom: BathroomKind,
    /// Explicit device list. Replaces the standard layout when present.
    pub devices: Option<Vec<DeviceSpec>>,
}

impl Config {
    /// Load configuration from `roomhub.toml` (or `ROOMHUB_CONFIG`, if set)
    /// then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ROOMHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROOMHUB_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("ROOMHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("ROOMHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("ROOMHUB_ROOM") {
            if let Ok(number) = val.parse() {
                self.room.number = number;
            }
        }
        if let Ok(val) = std::env::var("ROOMHUB_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("ROOMHUB_MQTT_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("ROOMHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.room.number == 0 {
            return Err(ConfigError::Validation(
                "room number must be at least 1".to_string(),
            ));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "broker port must be non-zero".to_string(),
            ));
        }
        if self.queue.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.queue.max_pending == 0 {
            return Err(ConfigError::Validation(
                "max_pending must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The configured room.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for room `0`.
    pub fn room_id(&self) -> Result<RoomId, ConfigError> {
        RoomId::try_from(self.room.number).map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Explicit devices when configured, the standard layout otherwise.
    #[must_use]
    pub fn device_specs(&self) -> Vec<DeviceSpec> {
        match &self.room.devices {
            Some(devices) => devices.clone(),
            None => standard_layout(self.room.living, self.room.bathroom),
        }
    }

    /// Queue settings, publishing on the broker's command topic.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            topic: self.mqtt.publish_topic.clone(),
            max_retries: self.queue.max_retries,
            retry_delay: Duration::from_millis(self.queue.retry_delay_ms),
            max_pending: self.queue.max_pending,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "roomhubd=info,roomhub_app=info,roomhub_adapter_mqtt=info,tower_http=debug"
                .to_string(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(1000),
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            number: 1,
            living: true,
            bathroom: BathroomKind::Standard,
            devices: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
