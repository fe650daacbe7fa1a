//! Event: an immutable record of something that happened on the delivery
//! or reconciliation path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, EventId};
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A device changed, from a user intent, a controller report or a timer.
    DeviceUpdated,
    /// An outbound command reached the transport.
    CommandDelivered,
    /// An outbound command is waiting in the retry queue.
    CommandQueued,
    /// An outbound command was given up on.
    CommandDropped,
    /// The transport connected or disconnected.
    ConnectionChanged,
    /// An inbound message could not be decoded.
    MessageRejected,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DeviceUpdated => "device_updated",
            Self::CommandDelivered => "command_delivered",
            Self::CommandQueued => "command_queued",
            Self::CommandDropped => "command_dropped",
            Self::ConnectionChanged => "connection_changed",
            Self::MessageRejected => "message_rejected",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub device_id: Option<DeviceId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    #[must_use]
    pub fn new(event_type: EventType, device_id: Option<DeviceId>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            device_id,
            data,
            timestamp: now(),
        }
    }
}
