//! Momentary (monostable) action: a one-shot trigger with a timed lifecycle.
//!
//! The phase is a pure function of the time elapsed since the trigger:
//!
//! | elapsed since trigger                 | phase       |
//! |---------------------------------------|-------------|
//! | `< 200 ms`                            | `pressed`   |
//! | `< execution_time_ms`                 | `executing` |
//! | `< execution_time_ms + cooldown_ms`   | `completed` |
//! | otherwise                             | `idle`      |
//!
//! Whoever owns the clock calls [`Momentary::advance`] at the offsets returned
//! by [`Momentary::schedule`]. Only the trigger itself produces a command.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::CommandAction;
use crate::error::TransitionError;

/// How long the button stays in the `pressed` phase.
pub const PRESS_DURATION_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentaryPhase {
    #[default]
    Idle,
    Pressed,
    Executing,
    Completed,
}

impl fmt::Display for MomentaryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Pressed => "pressed",
            Self::Executing => "executing",
            Self::Completed => "completed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Momentary {
    phase: MomentaryPhase,
    execution_time_ms: u64,
    cooldown_time_ms: u64,
}

impl Momentary {
    #[must_use]
    pub fn new(execution_time_ms: u64, cooldown_time_ms: u64) -> Self {
        Self {
            phase: MomentaryPhase::Idle,
            execution_time_ms,
            cooldown_time_ms,
        }
    }

    #[must_use]
    pub fn phase(&self) -> MomentaryPhase {
        self.phase
    }

    #[must_use]
    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    #[must_use]
    pub fn cooldown_time_ms(&self) -> u64 {
        self.cooldown_time_ms
    }

    /// Fire the action.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Busy`] unless the action is idle.
    pub fn trigger(&mut self) -> Result<CommandAction, TransitionError> {
        if self.phase != MomentaryPhase::Idle {
            return Err(TransitionError::Busy { phase: self.phase });
        }
        self.phase = MomentaryPhase::Pressed;
        Ok(CommandAction::Momentary)
    }

    /// Phase the action is in `elapsed_ms` after a trigger.
    #[must_use]
    pub fn phase_at(&self, elapsed_ms: u64) -> MomentaryPhase {
        let completed_at = self.execution_time_ms;
        let idle_at = completed_at.saturating_add(self.cooldown_time_ms);
        if elapsed_ms < PRESS_DURATION_MS {
            MomentaryPhase::Pressed
        } else if elapsed_ms < completed_at {
            MomentaryPhase::Executing
        } else if elapsed_ms < idle_at {
            MomentaryPhase::Completed
        } else {
            MomentaryPhase::Idle
        }
    }

    /// Offsets (ms after the trigger) at which the phase may change, ascending.
    #[must_use]
    pub fn schedule(&self) -> [u64; 3] {
        let mut offsets = [
            PRESS_DURATION_MS,
            self.execution_time_ms,
            self.execution_time_ms.saturating_add(self.cooldown_time_ms),
        ];
        offsets.sort_unstable();
        offsets
    }

    /// Move to the phase for `elapsed_ms`. Returns whether the phase changed.
    ///
    /// An idle action stays idle: a late timer cannot resurrect it.
    pub fn advance(&mut self, elapsed_ms: u64) -> bool {
        if self.phase == MomentaryPhase::Idle {
            return false;
        }
        let next = self.phase_at(elapsed_ms);
        let changed = next != self.phase;
        self.phase = next;
        changed
    }
}
