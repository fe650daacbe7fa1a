//! Dimmable light with power/level coupling.

use serde::{Deserialize, Serialize};

use crate::command::CommandAction;

/// Levels strictly between 0 and this value snap up to it.
pub const DEAD_ZONE_FLOOR: u8 = 10;

/// Level used when powering on with no remembered level.
pub const DEFAULT_ON_LEVEL: u8 = 50;

/// Dimmer state.
///
/// `level` is what the light currently shows, `set_level` is the last level
/// the user asked for. A power-off drops `level` to 0 but keeps `set_level`
/// so the next power-on restores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimmer {
    level: u8,
    set_level: u8,
    power: bool,
}

impl Dimmer {
    /// Build a dimmer from its configured level and power.
    #[must_use]
    pub fn new(set_level: u8, power: bool) -> Self {
        let mut dimmer = Self {
            level: 0,
            set_level: set_level.min(100),
            power: false,
        };
        if power {
            dimmer.set_power(true);
        }
        dimmer
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[must_use]
    pub fn set_level(&self) -> u8 {
        self.set_level
    }

    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    /// Turn the light on or off.
    pub fn set_power(&mut self, on: bool) -> CommandAction {
        if on {
            if self.set_level == 0 {
                self.set_level = DEFAULT_ON_LEVEL;
            }
            self.level = self.set_level;
        } else {
            self.level = 0;
        }
        self.power = on;
        self.command()
    }

    /// Apply a slider position. Power follows the level.
    pub fn set_level_direct(&mut self, pct: i64) -> CommandAction {
        let mut level = clamp_percent(pct);
        if level > 0 && level < DEAD_ZONE_FLOOR {
            level = DEAD_ZONE_FLOOR;
        }
        self.level = level;
        self.set_level = level;
        self.power = level > 0;
        self.command()
    }

    /// Reconcile with a level reported by the controller.
    ///
    /// `set_level` is only refreshed by a lit report, so an OFF report never
    /// erases the remembered level.
    pub fn apply_reported(&mut self, level: u8, reported_set: Option<u8>) {
        let level = level.min(100);
        self.level = level;
        self.power = level > 0;
        if level > 0 {
            self.set_level = match reported_set {
                Some(set) if set > 0 => set.min(100),
                _ => level,
            };
        }
    }

    fn command(&self) -> CommandAction {
        CommandAction::Dimmer {
            level: self.level,
            power: self.power,
        }
    }
}

/// Clamp any integer into `0..=100`.
#[must_use]
pub fn clamp_percent(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn off_with_memory(set_level: u8) -> Dimmer {
        Dimmer {
            level: 0,
            set_level,
            power: false,
        }
    }

    #[test]
    fn should_restore_set_level_when_powered_on() {
        let mut dimmer = off_with_memory(60);
        let cmd = dimmer.set_power(true);
        assert!(dimmer.power());
        assert_eq!(dimmer.level(), 60);
        assert_eq!(
            cmd,
            CommandAction::Dimmer {
                level: 60,
                power: true
            }
        );
    }

    #[test]
    fn should_keep_set_level_when_powered_off() {
        let mut dimmer = off_with_memory(60);
        dimmer.set_power(true);
        let cmd = dimmer.set_power(false);
        assert!(!dimmer.power());
        assert_eq!(dimmer.level(), 0);
        assert_eq!(dimmer.set_level(), 60);
        assert_eq!(
            cmd,
            CommandAction::Dimmer {
                level: 0,
                power: false
            }
        );
    }

    #[test]
    fn should_default_to_fifty_when_powering_on_without_memory() {
        let mut dimmer = off_with_memory(0);
        dimmer.set_power(true);
        assert_eq!(dimmer.level(), DEFAULT_ON_LEVEL);
        assert_eq!(dimmer.set_level(), DEFAULT_ON_LEVEL);
    }

    #[test]
    fn should_snap_dim_levels_to_dead_zone_floor() {
        let mut dimmer = off_with_memory(0);
        dimmer.set_level_direct(3);
        assert_eq!(dimmer.level(), 10);
        assert_eq!(dimmer.set_level(), 10);
        assert!(dimmer.power());
    }

    #[test]
    fn should_clamp_slider_values_out_of_range() {
        let mut dimmer = off_with_memory(0);
        dimmer.set_level_direct(250);
        assert_eq!(dimmer.level(), 100);
        dimmer.set_level_direct(-20);
        assert_eq!(dimmer.level(), 0);
        assert!(!dimmer.power());
    }

    #[test]
    fn should_power_off_when_slider_reaches_zero() {
        let mut dimmer = Dimmer::new(40, true);
        let cmd = dimmer.set_level_direct(0);
        assert!(!dimmer.power());
        assert_eq!(
            cmd,
            CommandAction::Dimmer {
                level: 0,
                power: false
            }
        );
    }

    #[test]
    fn should_not_erase_set_level_when_controller_reports_off() {
        let mut dimmer = Dimmer::new(70, true);
        dimmer.apply_reported(0, Some(0));
        assert!(!dimmer.power());
        assert_eq!(dimmer.level(), 0);
        assert_eq!(dimmer.set_level(), 70);
    }

    #[test]
    fn should_prefer_reported_setpoint_when_controller_reports_on() {
        let mut dimmer = off_with_memory(20);
        dimmer.apply_reported(75, Some(80));
        assert!(dimmer.power());
        assert_eq!(dimmer.level(), 75);
        assert_eq!(dimmer.set_level(), 80);

        dimmer.apply_reported(45, None);
        assert_eq!(dimmer.set_level(), 45);
    }

    #[test]
    fn should_start_dark_when_configured_off() {
        let dimmer = Dimmer::new(30, false);
        assert_eq!(dimmer.level(), 0);
        assert_eq!(dimmer.set_level(), 30);
        assert!(!dimmer.power());
    }
}
