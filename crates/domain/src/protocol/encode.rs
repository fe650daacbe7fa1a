//! Outbound command encoding.
//!
//! Every command carries the envelope (`Timestamp`, `nCamera`, `sNome` set to
//! the device wire name, `sLocale`) plus its type-specific fields:
//!
//! | device     | fields                                   |
//! |------------|------------------------------------------|
//! | dimmer     | `nLivello`, `bOnOff`                     |
//! | thermostat | `nTemperatura`, `bOnOff`                 |
//! | switch     | `bOnOff` or the per-device override      |
//! | momentary  | the action flag (or `bCommand`) = `true` |

use serde_json::{Map, Number, Value};

use super::message::WireMessage;
use super::tables::{momentary_flag, switch_field};
use crate::command::{CommandAction, DeviceCommand};
use crate::device::{clamp_percent, round_half};
use crate::id::RoomId;
use crate::section::Section;
use crate::time::Timestamp;

pub const FIELD_LEVEL: &str = "nLivello";
pub const FIELD_TEMPERATURE: &str = "nTemperatura";
pub const FIELD_POWER: &str = "bOnOff";

fn command(
    room: RoomId,
    section: Section,
    wire_name: &str,
    fields: Map<String, Value>,
    at: Timestamp,
) -> WireMessage {
    WireMessage {
        timestamp: at,
        room,
        name: wire_name.to_string(),
        locale: Some(section),
        fields,
    }
}

/// Dimmer command. `level` is clamped to `0..=100`.
#[must_use]
pub fn encode_dimmer_command(
    room: RoomId,
    section: Section,
    wire_name: &str,
    level: i64,
    power: bool,
    at: Timestamp,
) -> WireMessage {
    let mut fields = Map::new();
    fields.insert(FIELD_LEVEL.into(), Value::from(clamp_percent(level)));
    fields.insert(FIELD_POWER.into(), Value::Bool(power));
    command(room, section, wire_name, fields, at)
}

/// Thermostat command. The temperature is sent rounded to half a degree.
#[must_use]
pub fn encode_thermostat_command(
    room: RoomId,
    section: Section,
    wire_name: &str,
    temperature: f64,
    power: bool,
    at: Timestamp,
) -> WireMessage {
    let mut fields = Map::new();
    let temperature = Number::from_f64(round_half(temperature)).map_or(Value::Null, Value::Number);
    fields.insert(FIELD_TEMPERATURE.into(), temperature);
    fields.insert(FIELD_POWER.into(), Value::Bool(power));
    command(room, section, wire_name, fields, at)
}

#[must_use]
pub fn encode_switch_command(
    room: RoomId,
    section: Section,
    wire_name: &str,
    active: bool,
    at: Timestamp,
) -> WireMessage {
    let mut fields = Map::new();
    fields.insert(switch_field(wire_name).into(), Value::Bool(active));
    command(room, section, wire_name, fields, at)
}

#[must_use]
pub fn encode_momentary_command(
    room: RoomId,
    section: Section,
    wire_name: &str,
    at: Timestamp,
) -> WireMessage {
    let mut fields = Map::new();
    fields.insert(momentary_flag(wire_name).into(), Value::Bool(true));
    command(room, section, wire_name, fields, at)
}

/// Encode whatever a state machine produced.
#[must_use]
pub fn encode_command(cmd: &DeviceCommand, at: Timestamp) -> WireMessage {
    let id = &cmd.device;
    match cmd.action {
        CommandAction::Dimmer { level, power } => {
            encode_dimmer_command(id.room, id.section, &id.name, level.into(), power, at)
        }
        CommandAction::Thermostat { temperature, power } => {
            encode_thermostat_command(id.room, id.section, &id.name, temperature, power, at)
        }
        CommandAction::Switch { active } => {
            encode_switch_command(id.room, id.section, &id.name, active, at)
        }
        CommandAction::Momentary => encode_momentary_command(id.room, id.section, &id.name, at),
    }
}
