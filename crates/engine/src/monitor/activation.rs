// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global and per-unit activation sets

use sonde_core::{EventSet, UnitId};
use std::collections::HashMap;

/// Which events are requested, globally and per unit.
///
/// A unit's effective set is the union of the global set and its local set;
/// local activation only ever adds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ActivationState {
    global: EventSet,
    local: HashMap<UnitId, EventSet>,
}

impl ActivationState {
    pub fn global(&self) -> EventSet {
        self.global
    }

    pub fn set_global(&mut self, events: EventSet) {
        self.global = events;
    }

    pub fn local(&self, unit: UnitId) -> EventSet {
        self.local.get(&unit).copied().unwrap_or_default()
    }

    pub fn set_local(&mut self, unit: UnitId, events: EventSet) {
        if events.is_empty() {
            self.local.remove(&unit);
        } else {
            self.local.insert(unit, events);
        }
    }

    pub fn effective(&self, unit: UnitId) -> EventSet {
        self.global | self.local(unit)
    }

    /// Any set is non-empty
    pub fn is_engaged(&self) -> bool {
        !self.global.is_empty() || !self.local.is_empty()
    }

    pub fn forget(&mut self, unit: UnitId) {
        self.local.remove(&unit);
    }
}

#[cfg(test)]
#[path = "activation_tests.rs"]
mod tests;
