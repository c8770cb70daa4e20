// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instrumented executable form of a code unit

use crate::error::MonitorError;
use crate::event::EventSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque marker id in `[0, 255]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u8);

impl TryFrom<u32> for MarkerId {
    type Error = MonitorError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value).map(MarkerId).map_err(|_| {
            MonitorError::InvalidArgument(format!("marker id {} outside [0, 255]", value))
        })
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interception point at one offset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trap {
    /// Instrumented kinds that fire here
    pub events: EventSet,
    /// Marker armed at this offset
    pub marker: Option<MarkerId>,
}

impl Trap {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.marker.is_none()
    }
}

/// A unit's executable form for one activation state.
///
/// The trap table is empty when nothing is armed, so idle execution does a
/// single bounds check per instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executable {
    version: u64,
    events: EventSet,
    traps: Box<[Option<Trap>]>,
}

impl Executable {
    /// Uninstrumented form
    pub fn idle() -> Self {
        Self {
            version: 0,
            events: EventSet::EMPTY,
            traps: Box::new([]),
        }
    }

    /// Build from per-offset traps; drops the table when no trap is present
    pub fn new(version: u64, events: EventSet, traps: Vec<Option<Trap>>) -> Self {
        let traps = if traps.iter().all(Option::is_none) {
            Box::new([]) as Box<[Option<Trap>]>
        } else {
            traps.into_boxed_slice()
        };
        Self {
            version,
            events,
            traps,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Effective event set this form was built for
    pub fn events(&self) -> EventSet {
        self.events
    }

    pub fn trap(&self, offset: usize) -> Option<&Trap> {
        self.traps.get(offset)?.as_ref()
    }

    /// Offsets that carry a trap, in order
    pub fn trapped_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.traps
            .iter()
            .enumerate()
            .filter_map(|(offset, trap)| trap.as_ref().map(|_| offset))
    }

    pub fn trap_count(&self) -> usize {
        self.traps.iter().filter(|t| t.is_some()).count()
    }

    /// No traps and no check-only kinds
    pub fn is_idle(&self) -> bool {
        self.traps.is_empty() && self.events.is_empty()
    }

    /// Same traps and event set, ignoring version
    pub fn same_layout(&self, other: &Executable) -> bool {
        self.events == other.events && self.same_traps(other)
    }

    /// Same trap table; the check-only event set may differ
    pub fn same_traps(&self, other: &Executable) -> bool {
        self.traps == other.traps
    }
}

#[cfg(test)]
#[path = "executable_tests.rs"]
mod tests;
