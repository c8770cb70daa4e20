// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-unit marker table

use sonde_core::{MarkerId, UnitId};
use std::collections::{BTreeMap, HashMap};

/// At most one marker per (unit, offset)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MarkerTable {
    units: HashMap<UnitId, BTreeMap<usize, MarkerId>>,
}

impl MarkerTable {
    /// Arm `marker` at `offset`, returning the marker it replaced
    pub fn insert(&mut self, unit: UnitId, offset: usize, marker: MarkerId) -> Option<MarkerId> {
        self.units.entry(unit).or_default().insert(offset, marker)
    }

    pub fn remove(&mut self, unit: UnitId, offset: usize) -> Option<MarkerId> {
        let markers = self.units.get_mut(&unit)?;
        let removed = markers.remove(&offset);
        if markers.is_empty() {
            self.units.remove(&unit);
        }
        removed
    }

    pub fn get(&self, unit: UnitId, offset: usize) -> Option<MarkerId> {
        self.units.get(&unit)?.get(&offset).copied()
    }

    pub fn for_unit(&self, unit: UnitId) -> Option<&BTreeMap<usize, MarkerId>> {
        self.units.get(&unit)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn forget(&mut self, unit: UnitId) {
        self.units.remove(&unit);
    }
}

#[cfg(test)]
#[path = "markers_tests.rs"]
mod tests;
