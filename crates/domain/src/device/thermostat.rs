//! Thermostat: setpoint handling and climate-state derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::CommandAction;
use crate::error::ValidationError;

/// Heating/cooling actuator signals above this value count as active.
pub const ACTIVITY_THRESHOLD: f64 = 500.0;

/// Setpoint and measured temperature within this band read as neutral.
pub const NEUTRAL_BAND: f64 = 0.5;

/// What the climate system is doing, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateState {
    Heating,
    Cooling,
    Neutral,
    Off,
}

impl fmt::Display for ClimateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heating => "heating",
            Self::Cooling => "cooling",
            Self::Neutral => "neutral",
            Self::Off => "off",
        })
    }
}

/// Derive the climate state.
///
/// Actuator signals win over the temperature difference:
///
/// | condition                           | state     |
/// |-------------------------------------|-----------|
/// | power off                           | `off`     |
/// | heating signal > 500                | `heating` |
/// | cooling signal > 500                | `cooling` |
/// | abs(setpoint - measured) <= 0.5     | `neutral` |
/// | setpoint - measured > 0.5           | `heating` |
/// | otherwise                           | `cooling` |
#[must_use]
pub fn derive_climate_state(
    setpoint: f64,
    measured: f64,
    power: bool,
    heating_signal: f64,
    cooling_signal: f64,
) -> ClimateState {
    if !power {
        return ClimateState::Off;
    }
    if heating_signal > ACTIVITY_THRESHOLD {
        return ClimateState::Heating;
    }
    if cooling_signal > ACTIVITY_THRESHOLD {
        return ClimateState::Cooling;
    }
    let diff = setpoint - measured;
    if diff.abs() <= NEUTRAL_BAND {
        ClimateState::Neutral
    } else if diff > NEUTRAL_BAND {
        ClimateState::Heating
    } else {
        ClimateState::Cooling
    }
}

/// Round to the nearest half degree.
#[must_use]
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// One climate zone as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateReading {
    pub measured: f64,
    pub setpoint: f64,
    pub power: bool,
    pub heating: f64,
    pub cooling: f64,
    pub ventilation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    setpoint: f64,
    measured: f64,
    power: bool,
    min_temp: f64,
    max_temp: f64,
    climate_state: ClimateState,
}

impl Thermostat {
    /// # Errors
    ///
    /// Returns [`ValidationError::TemperatureRange`] when `min_temp > max_temp`
    /// or either bound is not finite.
    pub fn new(
        setpoint: f64,
        measured: f64,
        power: bool,
        min_temp: f64,
        max_temp: f64,
    ) -> Result<Self, ValidationError> {
        if !min_temp.is_finite() || !max_temp.is_finite() || min_temp > max_temp {
            return Err(ValidationError::TemperatureRange {
                min: min_temp,
                max: max_temp,
            });
        }
        let mut thermostat = Self {
            setpoint: min_temp,
            measured,
            power,
            min_temp,
            max_temp,
            climate_state: ClimateState::Off,
        };
        thermostat.setpoint = thermostat.normalize(setpoint);
        thermostat.refresh_local();
        Ok(thermostat)
    }

    #[must_use]
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    #[must_use]
    pub fn measured(&self) -> f64 {
        self.measured
    }

    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    #[must_use]
    pub fn min_temp(&self) -> f64 {
        self.min_temp
    }

    #[must_use]
    pub fn max_temp(&self) -> f64 {
        self.max_temp
    }

    #[must_use]
    pub fn climate_state(&self) -> ClimateState {
        self.climate_state
    }

    /// Set a new target temperature. Implies power on.
    pub fn set_setpoint(&mut self, temperature: f64) -> CommandAction {
        self.setpoint = self.normalize(temperature);
        self.power = true;
        self.refresh_local();
        self.command()
    }

    /// Nudge the setpoint by `delta` degrees.
    pub fn step_setpoint(&mut self, delta: f64) -> CommandAction {
        self.set_setpoint(self.setpoint + delta)
    }

    /// Toggle power. The setpoint is left alone.
    pub fn set_power(&mut self, on: bool) -> CommandAction {
        self.power = on;
        self.refresh_local();
        self.command()
    }

    /// Reconcile with a zone reading from the controller.
    ///
    /// A powered-off zone reports a zero setpoint; the local setpoint is kept
    /// in that case.
    pub fn apply_reported(&mut self, reading: &ClimateReading) {
        self.measured = reading.measured;
        self.power = reading.power;
        if reading.power {
            self.setpoint = self.normalize(reading.setpoint);
        }
        self.climate_state = derive_climate_state(
            self.setpoint,
            self.measured,
            self.power,
            reading.heating,
            reading.cooling,
        );
    }

    fn normalize(&self, temperature: f64) -> f64 {
        if !temperature.is_finite() {
            return self.setpoint;
        }
        round_half(temperature).max(self.min_temp).min(self.max_temp)
    }

    fn refresh_local(&mut self) {
        self.climate_state =
            derive_climate_state(self.setpoint, self.measured, self.power, 0.0, 0.0);
    }

    fn command(&self) -> CommandAction {
        CommandAction::Thermostat {
            temperature: self.setpoint,
            power: self.power,
        }
    }
}
