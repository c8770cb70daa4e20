// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compatibility guard between event monitoring and legacy tracing
//!
//! Both mechanisms intercept the same executable units, so the process is in
//! at most one of the two modes at a time.

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-wide interception mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Neither mechanism is engaged
    #[default]
    Idle,
    /// A trace hook, profile hook, or evaluation override is installed
    LegacyTrace,
    /// Some event is active globally or locally, or a marker is armed
    EventMonitoring,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::LegacyTrace => write!(f, "legacy tracing"),
            Mode::EventMonitoring => write!(f, "event monitoring"),
        }
    }
}

/// Inputs that drive guard transitions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardInput {
    EngageLegacy,
    ReleaseLegacy,
    EngageMonitoring,
    ReleaseMonitoring,
}

impl GuardInput {
    /// Input matching whether monitoring state is non-empty after a change
    pub fn monitoring(engaged: bool) -> Self {
        if engaged {
            GuardInput::EngageMonitoring
        } else {
            GuardInput::ReleaseMonitoring
        }
    }

    /// Input matching whether any legacy hook is installed after a change
    pub fn legacy(engaged: bool) -> Self {
        if engaged {
            GuardInput::EngageLegacy
        } else {
            GuardInput::ReleaseLegacy
        }
    }
}

/// Mutual-exclusion state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompatGuard {
    mode: Mode,
}

impl CompatGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Pure state transition; a conflicting input leaves `self` untouched
    pub fn transition(&self, input: GuardInput) -> Result<CompatGuard, MonitorError> {
        let mode = match (self.mode, input) {
            (Mode::EventMonitoring, GuardInput::EngageLegacy) => {
                return Err(MonitorError::Conflict {
                    requested: Mode::LegacyTrace,
                    engaged: Mode::EventMonitoring,
                })
            }
            (Mode::LegacyTrace, GuardInput::EngageMonitoring) => {
                return Err(MonitorError::Conflict {
                    requested: Mode::EventMonitoring,
                    engaged: Mode::LegacyTrace,
                })
            }
            (_, GuardInput::EngageLegacy) => Mode::LegacyTrace,
            (_, GuardInput::EngageMonitoring) => Mode::EventMonitoring,
            (Mode::LegacyTrace, GuardInput::ReleaseLegacy) => Mode::Idle,
            (Mode::EventMonitoring, GuardInput::ReleaseMonitoring) => Mode::Idle,
            // Releasing a mode that is not engaged changes nothing
            (mode, GuardInput::ReleaseLegacy | GuardInput::ReleaseMonitoring) => mode,
        };
        Ok(CompatGuard { mode })
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
