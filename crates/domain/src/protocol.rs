//! Controller wire protocol: stateless encode/decode between the device model
//! and flat JSON messages.
//!
//! Every room shares one channel in each direction, so every message carries
//! the room number (`nCamera`) and a discriminator (`sNome`). Commands sent to
//! the controller additionally carry the section token (`sLocale`).

pub mod decode;
pub mod encode;
pub mod message;
pub mod tables;

pub use decode::{
    ClimateZone, DEFAULT_TEMPERATURE, Decoded, DecodedCommand, DimmerReading, MessageKind,
    classify, decode_message, decode_temperature, validate_level,
};
pub use encode::{
    encode_command, encode_dimmer_command, encode_momentary_command, encode_switch_command,
    encode_thermostat_command,
};
pub use message::WireMessage;
