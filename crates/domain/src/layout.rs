//! Device configuration schema and built-in room layouts.
//!
//! [`DeviceSpec`] is the only shape a device declaration takes, whether it
//! comes from a config file or from [`standard_layout`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceState, Dimmer, Momentary, Switch, Thermostat};
use crate::error::{RoomHubError, ValidationError};
use crate::id::{DeviceId, RoomId};
use crate::section::Section;

pub const DEFAULT_EXECUTION_TIME_MS: u64 = 3000;
pub const DEFAULT_COOLDOWN_TIME_MS: u64 = 2000;

fn default_setpoint() -> f64 {
    21.0
}

fn default_min_temp() -> f64 {
    16.0
}

fn default_max_temp() -> f64 {
    28.0
}

fn default_true() -> bool {
    true
}

fn default_execution_time_ms() -> u64 {
    DEFAULT_EXECUTION_TIME_MS
}

fn default_cooldown_time_ms() -> u64 {
    DEFAULT_COOLDOWN_TIME_MS
}

/// Declaration of one device and its initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceSpec {
    Dimmer {
        section: Section,
        wire_name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        initial_level: u8,
        #[serde(default)]
        initial_power: bool,
    },
    Thermostat {
        section: Section,
        wire_name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default = "default_setpoint")]
        initial_temp: f64,
        #[serde(default = "default_setpoint")]
        measured_temp: f64,
        #[serde(default = "default_true")]
        initial_power: bool,
        #[serde(default = "default_min_temp")]
        min_temp: f64,
        #[serde(default = "default_max_temp")]
        max_temp: f64,
    },
    Switch {
        section: Section,
        wire_name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        initial_state: bool,
    },
    Momentary {
        section: Section,
        wire_name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default = "default_execution_time_ms")]
        execution_time_ms: u64,
        #[serde(default = "default_cooldown_time_ms")]
        cooldown_time_ms: u64,
    },
}

impl DeviceSpec {
    #[must_use]
    pub fn dimmer(section: Section, wire_name: &str, label: &str, initial_level: u8) -> Self {
        Self::Dimmer {
            section,
            wire_name: wire_name.to_string(),
            label: Some(label.to_string()),
            initial_level,
            initial_power: false,
        }
    }

    #[must_use]
    pub fn thermostat(section: Section, label: &str, min_temp: f64, max_temp: f64) -> Self {
        Self::Thermostat {
            section,
            wire_name: format!("{}Clima", section.locale()),
            label: Some(label.to_string()),
            initial_temp: default_setpoint(),
            measured_temp: default_setpoint(),
            initial_power: true,
            min_temp,
            max_temp,
        }
    }

    #[must_use]
    pub fn switch(section: Section, wire_name: &str, label: &str) -> Self {
        Self::Switch {
            section,
            wire_name: wire_name.to_string(),
            label: Some(label.to_string()),
            initial_state: false,
        }
    }

    #[must_use]
    pub fn momentary(wire_name: &str, label: &str) -> Self {
        Self::Momentary {
            section: Section::Settings,
            wire_name: wire_name.to_string(),
            label: Some(label.to_string()),
            execution_time_ms: DEFAULT_EXECUTION_TIME_MS,
            cooldown_time_ms: DEFAULT_COOLDOWN_TIME_MS,
        }
    }

    #[must_use]
    pub fn section(&self) -> Section {
        match self {
            Self::Dimmer { section, .. }
            | Self::Thermostat { section, .. }
            | Self::Switch { section, .. }
            | Self::Momentary { section, .. } => *section,
        }
    }

    #[must_use]
    pub fn wire_name(&self) -> &str {
        match self {
            Self::Dimmer { wire_name, .. }
            | Self::Thermostat { wire_name, .. }
            | Self::Switch { wire_name, .. }
            | Self::Momentary { wire_name, .. } => wire_name,
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Self::Dimmer { label, .. }
            | Self::Thermostat { label, .. }
            | Self::Switch { label, .. }
            | Self::Momentary { label, .. } => label.as_deref(),
        }
    }

    /// Instantiate the device for `room`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomHubError::Validation`] for an empty wire name or an
    /// inverted temperature range.
    pub fn build(&self, room: RoomId) -> Result<Device, RoomHubError> {
        let state = match self {
            Self::Dimmer {
                initial_level,
                initial_power,
                ..
            } => DeviceState::Dimmer(Dimmer::new(*initial_level, *initial_power)),
            Self::Thermostat {
                initial_temp,
                measured_temp,
                initial_power,
                min_temp,
                max_temp,
                ..
            } => DeviceState::Thermostat(Thermostat::new(
                *initial_temp,
                *measured_temp,
                *initial_power,
                *min_temp,
                *max_temp,
            )?),
            Self::Switch { initial_state, .. } => DeviceState::Switch(Switch::new(*initial_state)),
            Self::Momentary {
                execution_time_ms,
                cooldown_time_ms,
                ..
            } => DeviceState::Momentary(Momentary::new(*execution_time_ms, *cooldown_time_ms)),
        };
        let mut builder = Device::builder()
            .id(DeviceId::new(room, self.section(), self.wire_name()))
            .state(state);
        if let Some(label) = self.label() {
            builder = builder.label(label);
        }
        builder.build()
    }
}

/// Bathroom fit-out of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BathroomKind {
    None,
    #[default]
    Standard,
    /// Standard plus the `Speciale` light.
    Special,
}

/// The built-in control set for a room.
///
/// Bedroom and settings are always present; the living room and the
/// bathroom depend on the room's fit-out.
#[must_use]
pub fn standard_layout(living: bool, bathroom: BathroomKind) -> Vec<DeviceSpec> {
    let mut specs = vec![
        DeviceSpec::dimmer(Section::Bedroom, "Totale", "Main Light", 75),
        DeviceSpec::dimmer(Section::Bedroom, "Parziale", "Courtesy Light", 30),
        DeviceSpec::dimmer(Section::Bedroom, "Letto", "Bed Light", 50),
        DeviceSpec::dimmer(Section::Bedroom, "ComodinoSx", "Left Bedside Lamp", 60),
        DeviceSpec::dimmer(Section::Bedroom, "ComodinoDx", "Right Bedside Lamp", 60),
        DeviceSpec::dimmer(Section::Bedroom, "Scrivania", "Desk Light", 80),
        DeviceSpec::thermostat(Section::Bedroom, "Room Climate", 16.0, 28.0),
    ];

    if living {
        specs.extend([
            DeviceSpec::dimmer(Section::Living, "Totale", "Main Light", 75),
            DeviceSpec::dimmer(Section::Living, "Parziale", "Courtesy Light", 30),
            DeviceSpec::dimmer(Section::Living, "Divano", "Sofa Light", 50),
            DeviceSpec::dimmer(Section::Living, "Televisione", "TV Light", 40),
            DeviceSpec::thermostat(Section::Living, "Living Climate", 16.0, 28.0),
        ]);
    }

    if bathroom != BathroomKind::None {
        specs.extend([
            DeviceSpec::dimmer(Section::Bathroom, "Totale", "Main Light", 85),
            DeviceSpec::dimmer(Section::Bathroom, "Parziale", "Courtesy Light", 25),
        ]);
        if bathroom == BathroomKind::Special {
            specs.push(DeviceSpec::dimmer(
                Section::Bathroom,
                "Speciale",
                "Special Light",
                50,
            ));
        }
        specs.extend([
            DeviceSpec::thermostat(Section::Bathroom, "Bathroom Climate", 18.0, 30.0),
            DeviceSpec::switch(Section::Bathroom, "ScaldaOnOff", "Towel Heater"),
        ]);
    }

    specs.extend([
        DeviceSpec::momentary("ResetLuci", "Light Reset"),
        DeviceSpec::momentary("ResetClima", "Climate Reset"),
        DeviceSpec::momentary("TurnDown", "Turn-Down Service"),
    ]);
    specs
}

/// Build every declared device for `room`.
///
/// # Errors
///
/// Returns [`ValidationError::DuplicateDevice`] when two specs share a
/// section and wire name, or any error from [`DeviceSpec::build`].
pub fn build_devices(room: RoomId, specs: &[DeviceSpec]) -> Result<Vec<Device>, RoomHubError> {
    let mut seen = HashSet::new();
    let mut devices = Vec::with_capacity(specs.len());
    for spec in specs {
        let device = spec.build(room)?;
        if !seen.insert(device.id.clone()) {
            return Err(ValidationError::DuplicateDevice(device.id.to_string()).into());
        }
        devices.push(device);
    }
    Ok(devices)
}
