//! # roomhub-adapter-mqtt
//!
//! MQTT adapter: carries controller traffic over a broker with rumqttc.
//!
//! ## Responsibilities
//! - Connect to the broker and keep the connection alive
//! - Re-subscribe after each reconnection, with a bounded retry count
//! - Forward inbound publishes and connection changes to the application
//! - Publish encoded commands
//!
//! ## Dependency rule
//! Same as other adapters: depends on `roomhub-app` and `roomhub-domain`.

pub mod config;
pub mod error;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::MqttTransport;
