//! The flat JSON object exchanged with the controller.

use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::id::RoomId;
use crate::section::Section;
use crate::time::{self, Timestamp};

pub const FIELD_TIMESTAMP: &str = "Timestamp";
pub const FIELD_ROOM: &str = "nCamera";
pub const FIELD_NAME: &str = "sNome";
pub const FIELD_LOCALE: &str = "sLocale";

/// A wire message with its envelope fields lifted out.
///
/// `fields` holds every other key (levels, setpoints, flags).
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub timestamp: Timestamp,
    pub room: RoomId,
    /// The `sNome` discriminator: a state tag on controller messages, the
    /// device wire name on commands.
    pub name: String,
    /// Present on commands only.
    pub locale: Option<Section>,
    pub fields: Map<String, Value>,
}

impl WireMessage {
    /// Parse a raw payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the payload is not a JSON object or a
    /// required envelope field is missing or malformed.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(raw).map_err(ProtocolError::Json)?;
        Self::from_value(value)
    }

    /// Build from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`WireMessage::parse`].
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let timestamp = match fields.remove(FIELD_TIMESTAMP) {
            None | Some(Value::Null) => return Err(ProtocolError::MissingField(FIELD_TIMESTAMP)),
            Some(Value::String(text)) => {
                time::from_wire(&text).ok_or(ProtocolError::InvalidTimestamp(text))?
            }
            Some(other) => return Err(ProtocolError::InvalidTimestamp(other.to_string())),
        };

        let room = match fields.remove(FIELD_ROOM) {
            None | Some(Value::Null) => return Err(ProtocolError::MissingField(FIELD_ROOM)),
            Some(value) => parse_room(&value).ok_or_else(|| ProtocolError::InvalidRoom(value.to_string()))?,
        };

        let name = match fields.remove(FIELD_NAME) {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(ProtocolError::MissingField(FIELD_NAME)),
        };

        let locale = match fields.remove(FIELD_LOCALE) {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) => Some(Section::from_locale(&token)?),
            Some(other) => return Err(ProtocolError::UnknownLocale(other.to_string())),
        };

        Ok(Self {
            timestamp,
            room,
            name,
            locale,
            fields,
        })
    }

    /// Render back to a JSON object, envelope included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(
            FIELD_TIMESTAMP.to_string(),
            Value::String(time::to_wire(self.timestamp)),
        );
        object.insert(FIELD_ROOM.to_string(), Value::from(self.room.get()));
        object.insert(FIELD_NAME.to_string(), Value::String(self.name.clone()));
        if let Some(section) = self.locale {
            object.insert(
                FIELD_LOCALE.to_string(),
                Value::String(section.locale().to_string()),
            );
        }
        Value::Object(object)
    }

    /// Serialized payload ready for publishing.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }
}

/// Accepts a positive integer, or a string holding one.
fn parse_room(value: &Value) -> Option<RoomId> {
    let number = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(number).ok().and_then(|n| RoomId::try_from(n).ok())
}
