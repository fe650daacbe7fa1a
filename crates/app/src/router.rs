//! Inbound router: applies controller reports to the device registry.
//!
//! Messages for other rooms are dropped without a trace beyond the history,
//! since every room shares the same channel. Updates made here are tagged
//! [`ChangeOrigin::Controller`] and never produce outbound commands.

use std::sync::Arc;

use roomhub_domain::device::{ClimateReading, DeviceKind, DeviceState};
use roomhub_domain::event::{Event, EventType};
use roomhub_domain::id::{DeviceId, RoomId};
use roomhub_domain::protocol::tables::switch_field;
use roomhub_domain::protocol::{ClimateZone, DimmerReading, MessageKind, decode_message};
use roomhub_domain::section::Section;
use roomhub_domain::time::now;

use crate::history::{HistoryEntry, MessageHistory, RouteStatus};
use crate::ports::EventPublisher;
use crate::registry::{ChangeOrigin, DeviceRegistry};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A state report for this room; `updated` devices matched it.
    Applied { updated: usize },
    ForeignRoom,
    /// Well formed but nothing to apply (echoes, acks, unknown tags).
    Ignored,
    Rejected { reason: String },
}

impl RouteOutcome {
    fn status(&self) -> RouteStatus {
        match self {
            Self::Applied { .. } => RouteStatus::Applied,
            Self::ForeignRoom => RouteStatus::ForeignRoom,
            Self::Ignored => RouteStatus::Ignored,
            Self::Rejected { .. } => RouteStatus::Rejected,
        }
    }
}

pub struct InboundRouter<P> {
    registry: Arc<DeviceRegistry>,
    history: Arc<MessageHistory>,
    publisher: P,
}

impl<P: EventPublisher> InboundRouter<P> {
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>, history: Arc<MessageHistory>, publisher: P) -> Self {
        Self {
            registry,
            history,
            publisher,
        }
    }

    /// Decode one raw payload and apply it when it belongs to `room`.
    pub async fn route(&self, room: RoomId, raw: &[u8]) -> RouteOutcome {
        let decoded = match decode_message(raw) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(%err, "dropping malformed message");
                let reason = err.to_string();
                self.reject(&reason).await;
                return RouteOutcome::Rejected { reason };
            }
        };
        let message_room = decoded.message.room;
        let outcome = if message_room == room {
            self.dispatch(room, &decoded.kind)
        } else {
            RouteOutcome::ForeignRoom
        };
        self.history.record(HistoryEntry {
            received_at: now(),
            kind: decoded.kind.tag().to_string(),
            room: Some(message_room),
            name: Some(decoded.message.name),
            status: outcome.status(),
        });
        outcome
    }

    async fn reject(&self, reason: &str) {
        self.history.record(HistoryEntry {
            received_at: now(),
            kind: "invalid".to_string(),
            room: None,
            name: None,
            status: RouteStatus::Rejected,
        });
        let event = Event::new(
            EventType::MessageRejected,
            None,
            serde_json::json!({ "reason": reason }),
        );
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, "failed to publish rejection event");
        }
    }

    fn dispatch(&self, room: RoomId, kind: &MessageKind) -> RouteOutcome {
        match kind {
            MessageKind::DimmerState {
                section,
                zones,
                unmapped,
            } => {
                for prefix in unmapped {
                    tracing::debug!(%room, %section, %prefix, "skipping unmapped dimmer zone");
                }
                let updated = zones
                    .iter()
                    .filter(|zone| self.apply_dimmer(room, *section, zone))
                    .count();
                RouteOutcome::Applied { updated }
            }
            MessageKind::ClimateState { zones } => {
                let updated = zones
                    .iter()
                    .filter(|zone| self.apply_climate(room, zone))
                    .count();
                RouteOutcome::Applied { updated }
            }
            MessageKind::SwitchState { section, flags } => {
                let updated = self
                    .registry
                    .find(room, *section, DeviceKind::Switch)
                    .into_iter()
                    .filter(|id| {
                        let field = switch_field(&id.name);
                        flags
                            .iter()
                            .find(|(name, _)| name == field)
                            .is_some_and(|&(_, active)| self.apply_switch(id, active))
                    })
                    .count();
                RouteOutcome::Applied { updated }
            }
            MessageKind::MomentaryAck { section } => {
                tracing::debug!(%room, %section, "momentary acknowledgement");
                RouteOutcome::Ignored
            }
            MessageKind::Command(command) => {
                tracing::debug!(%room, section = %command.section, name = %command.wire_name, "ignoring command echo");
                RouteOutcome::Ignored
            }
            MessageKind::Unknown { name } => {
                tracing::debug!(%room, %name, "ignoring unknown discriminator");
                RouteOutcome::Ignored
            }
        }
    }

    fn apply_dimmer(&self, room: RoomId, section: Section, zone: &DimmerReading) -> bool {
        let id = DeviceId::new(room, section, zone.wire_name);
        let matched = self.registry.update(&id, ChangeOrigin::Controller, |device| {
            if let DeviceState::Dimmer(dimmer) = &mut device.state {
                dimmer.apply_reported(zone.level, zone.set_level);
                true
            } else {
                false
            }
        });
        match matched {
            Ok(matched) => matched,
            Err(_) => {
                tracing::debug!(%id, "dimmer zone has no device in this room");
                false
            }
        }
    }

    fn apply_climate(&self, room: RoomId, zone: &ClimateZone) -> bool {
        let Some(id) = self
            .registry
            .find(room, zone.section, DeviceKind::Thermostat)
            .into_iter()
            .next()
        else {
            tracing::debug!(%room, section = %zone.section, "climate zone has no thermostat");
            return false;
        };
        let reading: ClimateReading = zone.reading;
        self.registry
            .update(&id, ChangeOrigin::Controller, |device| {
                if let DeviceState::Thermostat(thermostat) = &mut device.state {
                    thermostat.apply_reported(&reading);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }

    fn apply_switch(&self, id: &DeviceId, active: bool) -> bool {
        self.registry
            .update(id, ChangeOrigin::Controller, |device| {
                if let DeviceState::Switch(switch) = &mut device.state {
                    switch.apply_reported(active);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false)
    }
}
