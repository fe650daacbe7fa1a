//! Inbound message decoding.
//!
//! Decoding never panics and never rejects out-of-range numbers: levels are
//! clamped and temperatures fall back to [`DEFAULT_TEMPERATURE`]. Only a broken
//! envelope makes [`decode_message`] fail.

use serde::Serialize;
use serde_json::Value;

use super::encode::{FIELD_LEVEL, FIELD_POWER, FIELD_TEMPERATURE};
use super::message::WireMessage;
use super::tables::{self, Discriminator};
use crate::command::CommandAction;
use crate::device::{ClimateReading, clamp_percent, round_half};
use crate::error::ProtocolError;
use crate::section::Section;

/// Temperature reported when the raw value is unusable.
pub const DEFAULT_TEMPERATURE: f64 = 20.0;

/// Highest plausible raw temperature, in tenths of a degree.
pub const MAX_RAW_TEMPERATURE: f64 = 600.0;

/// Convert a raw value in tenths of a degree, rounded to half a degree.
///
/// Negative, implausibly high and NaN inputs yield [`DEFAULT_TEMPERATURE`].
#[must_use]
pub fn decode_temperature(raw: f64) -> f64 {
    if !raw.is_finite() || !(0.0..=MAX_RAW_TEMPERATURE).contains(&raw) {
        return DEFAULT_TEMPERATURE;
    }
    round_half(raw / 10.0)
}

/// Read a level the way a lenient integer parser would, clamped to `0..=100`.
///
/// Numbers are truncated, strings are read up to the first non-digit, and
/// anything else is 0.
#[must_use]
pub fn validate_level(raw: &Value) -> u8 {
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(i) => clamp_percent(i),
            None => n.as_f64().map_or(0, truncate_percent),
        },
        Value::String(s) => leading_integer(s).map_or(0, clamp_percent),
        _ => 0,
    }
}

fn truncate_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    // saturating float-to-int cast, then clamp
    #[allow(clippy::cast_possible_truncation)]
    let truncated = value.trunc() as i64;
    clamp_percent(truncated)
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_start = usize::from(text.starts_with(['-', '+']));
    let end = text[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |pos| pos + digits_start);
    if end == digits_start {
        return None;
    }
    // only overflow can fail here
    let saturated = if text.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    };
    Some(text[..end].parse::<i64>().unwrap_or(saturated))
}

fn number(raw: Option<&Value>) -> Option<f64> {
    match raw? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One dimmer zone from a `<Locale>Luci` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimmerReading {
    pub wire_name: &'static str,
    pub level: u8,
    /// `<prefix>Set`, when the controller sent it.
    pub set_level: Option<u8>,
}

/// One climate zone from a `Clima` / `<Locale>Clima` report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateZone {
    pub section: Section,
    pub reading: ClimateReading,
}

/// A command echo: a message carrying `sLocale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCommand {
    pub section: Section,
    pub wire_name: String,
    pub action: CommandAction,
}

/// What an inbound message is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    DimmerState {
        section: Section,
        zones: Vec<DimmerReading>,
        /// `<prefix>Liv` fields with no zone in the table.
        unmapped: Vec<String>,
    },
    ClimateState {
        zones: Vec<ClimateZone>,
    },
    SwitchState {
        section: Section,
        /// Every boolean `b*` field of the report.
        flags: Vec<(String, bool)>,
    },
    MomentaryAck {
        section: Section,
    },
    Command(DecodedCommand),
    Unknown {
        name: String,
    },
}

impl MessageKind {
    /// Short tag used in diagnostics and history filters.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DimmerState { .. } => "dimmer",
            Self::ClimateState { .. } => "climate",
            Self::SwitchState { .. } => "switch",
            Self::MomentaryAck { .. } => "momentary",
            Self::Command(_) => "command",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// A parsed message and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub message: WireMessage,
    pub kind: MessageKind,
}

/// Parse and classify a raw payload.
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the envelope is malformed (see
/// [`WireMessage::parse`]). Unknown discriminators are not errors; they
/// decode to [`MessageKind::Unknown`].
pub fn decode_message(raw: &[u8]) -> Result<Decoded, ProtocolError> {
    let message = WireMessage::parse(raw)?;
    let kind = classify(&message);
    Ok(Decoded { message, kind })
}

/// Classify an already parsed message.
#[must_use]
pub fn classify(msg: &WireMessage) -> MessageKind {
    if let Some(section) = msg.locale {
        return decode_command(msg, section);
    }
    match tables::discriminator(&msg.name) {
        Some(Discriminator::Dimmer(section)) => decode_dimmer_state(msg, section),
        Some(Discriminator::Climate(scope)) => decode_climate_state(msg, scope),
        Some(Discriminator::Switch(section)) => MessageKind::SwitchState {
            section,
            flags: msg
                .fields
                .iter()
                .filter(|(key, _)| key.starts_with('b'))
                .filter_map(|(key, value)| value.as_bool().map(|flag| (key.clone(), flag)))
                .collect(),
        },
        Some(Discriminator::Momentary(section)) => MessageKind::MomentaryAck { section },
        None => MessageKind::Unknown {
            name: msg.name.clone(),
        },
    }
}

fn decode_dimmer_state(msg: &WireMessage, section: Section) -> MessageKind {
    let known = tables::dimmer_zones(section);
    let zones = known
        .iter()
        .filter_map(|zone| {
            let level = msg.field(&format!("{}Liv", zone.prefix))?;
            Some(DimmerReading {
                wire_name: zone.wire_name,
                level: validate_level(level),
                set_level: msg.field(&format!("{}Set", zone.prefix)).map(validate_level),
            })
        })
        .collect();
    let unmapped = msg
        .fields
        .keys()
        .filter_map(|key| key.strip_suffix("Liv"))
        .filter(|prefix| !known.iter().any(|zone| zone.prefix == *prefix))
        .map(str::to_string)
        .collect();
    MessageKind::DimmerState {
        section,
        zones,
        unmapped,
    }
}

fn decode_climate_state(msg: &WireMessage, scope: Option<Section>) -> MessageKind {
    let sections: Vec<Section> = match scope {
        Some(section) => vec![section],
        None => Section::PHYSICAL.to_vec(),
    };
    let zones = sections
        .into_iter()
        .filter_map(|section| {
            let field = |suffix: &str| msg.field(&format!("n{}{suffix}", section.locale()));
            let measured = field("Mis")?;
            let setpoint = field("Set")?;
            let raw_setpoint = number(Some(setpoint)).unwrap_or(f64::NAN);
            Some(ClimateZone {
                section,
                reading: ClimateReading {
                    measured: decode_temperature(number(Some(measured)).unwrap_or(f64::NAN)),
                    setpoint: decode_temperature(raw_setpoint),
                    power: raw_setpoint > 0.0,
                    heating: number(field("Cal")).unwrap_or(0.0),
                    cooling: number(field("Fre")).unwrap_or(0.0),
                    ventilation: number(field("Ven")).unwrap_or(0.0),
                },
            })
        })
        .collect();
    MessageKind::ClimateState { zones }
}

fn decode_command(msg: &WireMessage, section: Section) -> MessageKind {
    let power = msg.bool_field(FIELD_POWER);
    let action = if let Some(level) = msg.field(FIELD_LEVEL) {
        let level = validate_level(level);
        Some(CommandAction::Dimmer {
            level,
            power: power.unwrap_or(level > 0),
        })
    } else if let Some(temperature) = number(msg.field(FIELD_TEMPERATURE)) {
        Some(CommandAction::Thermostat {
            temperature,
            power: power.unwrap_or(true),
        })
    } else if tables::momentary_flag_fields().any(|flag| msg.bool_field(flag) == Some(true)) {
        Some(CommandAction::Momentary)
    } else {
        msg.bool_field(tables::switch_field(&msg.name))
            .map(|active| CommandAction::Switch { active })
    };
    match action {
        Some(action) => MessageKind::Command(DecodedCommand {
            section,
            wire_name: msg.name.clone(),
            action,
        }),
        None => MessageKind::Unknown {
            name: msg.name.clone(),
        },
    }
}
