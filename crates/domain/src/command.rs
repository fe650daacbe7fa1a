//! Outbound commands produced by device state transitions.

use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;
use crate::id::DeviceId;

/// What a device transition asks the controller to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandAction {
    Dimmer { level: u8, power: bool },
    Thermostat { temperature: f64, power: bool },
    Switch { active: bool },
    Momentary,
}

impl CommandAction {
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Dimmer { .. } => DeviceKind::Dimmer,
            Self::Thermostat { .. } => DeviceKind::Thermostat,
            Self::Switch { .. } => DeviceKind::Switch,
            Self::Momentary => DeviceKind::Momentary,
        }
    }
}

/// A command addressed to one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub device: DeviceId,
    pub action: CommandAction,
}
