//! On/off switch.

use serde::{Deserialize, Serialize};

use crate::command::CommandAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Switch {
    active: bool,
}

impl Switch {
    #[must_use]
    pub fn new(active: bool) -> Self {
        Self { active }
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) -> CommandAction {
        self.set_active(!self.active)
    }

    pub fn set_active(&mut self, active: bool) -> CommandAction {
        self.active = active;
        CommandAction::Switch { active }
    }

    pub fn apply_reported(&mut self, active: bool) {
        self.active = active;
    }
}
