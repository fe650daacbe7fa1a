//! Device: a controllable thing in a room (light, thermostat, switch, action).
//!
//! Each device type owns its transition logic in a submodule. Every accepted
//! user intent yields exactly one [`DeviceCommand`]; reconciliation with
//! controller reports goes through the `apply_reported` methods and never
//! produces one.

mod dimmer;
mod momentary;
mod switch;
mod thermostat;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::dimmer::{DEAD_ZONE_FLOOR, DEFAULT_ON_LEVEL, Dimmer, clamp_percent};
pub use self::momentary::{Momentary, MomentaryPhase, PRESS_DURATION_MS};
pub use self::switch::Switch;
pub use self::thermostat::{
    ACTIVITY_THRESHOLD, ClimateReading, ClimateState, NEUTRAL_BAND, Thermostat,
    derive_climate_state, round_half,
};

use crate::command::DeviceCommand;
use crate::error::{RoomHubError, TransitionError, ValidationError};
use crate::id::DeviceId;
use crate::time::{Timestamp, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Dimmer,
    Thermostat,
    Switch,
    Momentary,
}

impl DeviceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dimmer => "dimmer",
            Self::Thermostat => "thermostat",
            Self::Switch => "switch",
            Self::Momentary => "momentary",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dimmer" => Ok(Self::Dimmer),
            "thermostat" => Ok(Self::Thermostat),
            "switch" => Ok(Self::Switch),
            "momentary" => Ok(Self::Momentary),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Type-specific state of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceState {
    Dimmer(Dimmer),
    Thermostat(Thermostat),
    Switch(Switch),
    Momentary(Momentary),
}

impl DeviceState {
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Dimmer(_) => DeviceKind::Dimmer,
            Self::Thermostat(_) => DeviceKind::Thermostat,
            Self::Switch(_) => DeviceKind::Switch,
            Self::Momentary(_) => DeviceKind::Momentary,
        }
    }
}

/// Something a user asks a device to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    SetPower { on: bool },
    SetLevel { level: i64 },
    SetSetpoint { temperature: f64 },
    StepSetpoint { delta: f64 },
    Toggle,
    SetActive { active: bool },
    Trigger,
}

impl Intent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPower { .. } => "set_power",
            Self::SetLevel { .. } => "set_level",
            Self::SetSetpoint { .. } => "set_setpoint",
            Self::StepSetpoint { .. } => "step_setpoint",
            Self::Toggle => "toggle",
            Self::SetActive { .. } => "set_active",
            Self::Trigger => "trigger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub label: String,
    pub state: DeviceState,
    pub last_updated: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.state.kind()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RoomHubError::Validation`] when the label or wire name is
    /// empty, or when a momentary action's timings would skip its executing
    /// or completed phase.
    pub fn validate(&self) -> Result<(), RoomHubError> {
        if self.label.is_empty() || self.id.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let DeviceState::Momentary(action) = &self.state {
            if action.execution_time_ms() <= PRESS_DURATION_MS || action.cooldown_time_ms() == 0 {
                return Err(ValidationError::MomentaryTiming {
                    execution_ms: action.execution_time_ms(),
                    cooldown_ms: action.cooldown_time_ms(),
                    press_ms: PRESS_DURATION_MS,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Run a user intent through the device's state machine.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::UnsupportedIntent`] when the intent does not
    /// apply to this device type, or [`TransitionError::Busy`] for a momentary
    /// action that is still running. The device is unchanged on error.
    pub fn apply(&mut self, intent: Intent, at: Timestamp) -> Result<DeviceCommand, TransitionError> {
        let kind = self.kind();
        let unsupported = TransitionError::UnsupportedIntent {
            kind,
            intent: intent.name(),
        };
        let action = match (&mut self.state, intent) {
            (DeviceState::Dimmer(d), Intent::SetPower { on }) => d.set_power(on),
            (DeviceState::Dimmer(d), Intent::SetLevel { level }) => d.set_level_direct(level),
            (DeviceState::Dimmer(d), Intent::Toggle) => d.set_power(!d.power()),
            (DeviceState::Thermostat(t), Intent::SetPower { on }) => t.set_power(on),
            (DeviceState::Thermostat(t), Intent::SetSetpoint { temperature }) => {
                t.set_setpoint(temperature)
            }
            (DeviceState::Thermostat(t), Intent::StepSetpoint { delta }) => t.step_setpoint(delta),
            (DeviceState::Thermostat(t), Intent::Toggle) => t.set_power(!t.power()),
            (DeviceState::Switch(s), Intent::Toggle) => s.toggle(),
            (DeviceState::Switch(s), Intent::SetActive { active } | Intent::SetPower { on: active }) => {
                s.set_active(active)
            }
            (DeviceState::Momentary(m), Intent::Trigger) => m.trigger()?,
            _ => return Err(unsupported),
        };
        self.last_updated = at;
        Ok(DeviceCommand {
            device: self.id.clone(),
            action,
        })
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    label: Option<String>,
    state: Option<DeviceState>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn state(mut self, state: DeviceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// A missing label falls back to the wire name.
    ///
    /// # Errors
    ///
    /// Returns [`RoomHubError::Validation`] if the id or state is missing,
    /// or if [`Device::validate`] fails.
    pub fn build(self) -> Result<Device, RoomHubError> {
        let (Some(id), Some(state)) = (self.id, self.state) else {
            return Err(ValidationError::EmptyName.into());
        };
        let device = Device {
            label: self.label.unwrap_or_else(|| id.name.clone()),
            id,
            state,
            last_updated: now(),
        };
        device.validate()?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandAction;
    use crate::id::RoomId;
    use crate::section::Section;

    fn device(section: Section, name: &str, state: DeviceState) -> Device {
        Device::builder()
            .id(DeviceId::new(RoomId::try_from(12).unwrap(), section, name))
            .state(state)
            .build()
            .unwrap()
    }

    #[test]
    fn should_emit_one_command_per_dimmer_intent() {
        let mut light = device(
            Section::Bedroom,
            "Totale",
            DeviceState::Dimmer(Dimmer::new(60, false)),
        );
        let cmd = light.apply(Intent::SetPower { on: true }, now()).unwrap();
        assert_eq!(cmd.device, light.id);
        assert_eq!(
            cmd.action,
            CommandAction::Dimmer {
                level: 60,
                power: true
            }
        );
    }

    #[test]
    fn should_reject_intent_for_wrong_device_type() {
        let mut switch = device(
            Section::Bathroom,
            "ScaldaOnOff",
            DeviceState::Switch(Switch::new(false)),
        );
        let before = switch.clone();
        let err = switch.apply(Intent::SetLevel { level: 40 }, now()).unwrap_err();
        assert_eq!(
            err,
            TransitionError::UnsupportedIntent {
                kind: DeviceKind::Switch,
                intent: "set_level"
            }
        );
        assert_eq!(switch, before);
    }

    #[test]
    fn should_propagate_busy_from_momentary_action() {
        let mut action = device(
            Section::Settings,
            "ResetLuci",
            DeviceState::Momentary(Momentary::new(3000, 2000)),
        );
        action.apply(Intent::Trigger, now()).unwrap();
        let err = action.apply(Intent::Trigger, now()).unwrap_err();
        assert!(matches!(err, TransitionError::Busy { .. }));
    }

    #[test]
    fn should_default_label_to_wire_name() {
        let light = device(
            Section::Living,
            "Divano",
            DeviceState::Dimmer(Dimmer::new(0, false)),
        );
        assert_eq!(light.label, "Divano");
    }

    #[test]
    fn should_return_validation_error_when_wire_name_is_empty() {
        let result = Device::builder()
            .id(DeviceId::new(RoomId::try_from(1).unwrap(), Section::Bedroom, ""))
            .label("Main")
            .state(DeviceState::Switch(Switch::new(false)))
            .build();
        assert!(matches!(
            result,
            Err(RoomHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_momentary_timings_that_skip_a_phase() {
        let id = DeviceId::new(RoomId::try_from(12).unwrap(), Section::Settings, "TurnDown");
        for (execution, cooldown) in [(200, 2000), (150, 2000), (3000, 0)] {
            let result = Device::builder()
                .id(id.clone())
                .state(DeviceState::Momentary(Momentary::new(execution, cooldown)))
                .build();
            assert!(
                matches!(
                    result,
                    Err(RoomHubError::Validation(ValidationError::MomentaryTiming { .. }))
                ),
                "{execution}/{cooldown} should be rejected"
            );
        }

        let shortest = Device::builder()
            .id(id)
            .state(DeviceState::Momentary(Momentary::new(201, 1)))
            .build();
        assert!(shortest.is_ok());
    }

    #[test]
    fn should_deserialize_intent_from_tagged_json() {
        let intent: Intent = serde_json::from_str(r#"{"intent":"set_level","level":40}"#).unwrap();
        assert_eq!(intent, Intent::SetLevel { level: 40 });
        let intent: Intent = serde_json::from_str(r#"{"intent":"trigger"}"#).unwrap();
        assert_eq!(intent, Intent::Trigger);
    }

    #[test]
    fn should_parse_device_kind_names() {
        assert_eq!("thermostat".parse::<DeviceKind>().unwrap(), DeviceKind::Thermostat);
        assert!("fan".parse::<DeviceKind>().is_err());
    }
}
