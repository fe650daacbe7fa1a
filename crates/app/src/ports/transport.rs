//! Transport port: the publish/subscribe channel to the controller.
//!
//! The transport owns the connection, including reconnection with its own
//! bounded backoff. The core only publishes payloads and reacts to the
//! notifications delivered on the receiver returned by
//! [`Transport::connect`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use roomhub_domain::error::RoomHubError;

/// Notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

/// Minimal publish/subscribe client.
pub trait Transport: Send + Sync {
    /// Start connecting. Connection changes and inbound messages arrive on
    /// the returned receiver for as long as the transport lives.
    ///
    /// Must be called once.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<TransportEvent>, RoomHubError>> + Send;

    /// Subscribe to `topic`. Subscriptions survive reconnections.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), RoomHubError>> + Send;

    /// Publish one payload. Fails when the transport is down or the client
    /// rejects the request.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), RoomHubError>> + Send;

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;
}

impl<T: Transport> Transport for Arc<T> {
    fn connect(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<TransportEvent>, RoomHubError>> + Send {
        (**self).connect()
    }

    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        (**self).subscribe(topic)
    }

    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), RoomHubError>> + Send {
        (**self).publish(topic, payload)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
