// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event kinds and event sets
//!
//! An `EventKind` is a monitorable occurrence. Its discriminant is a stable bit
//! index, so kinds combine into an `EventSet` with bitwise OR.

use crate::error::MonitorError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};
use std::str::FromStr;

/// A monitorable occurrence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    /// A user function frame begins executing
    Start = 0,
    /// A suspended generator frame is re-entered
    Resume = 1,
    /// A user function returns
    Return = 2,
    /// A generator frame yields a value
    Yield = 3,
    /// A call site invokes a user function
    Call = 4,
    /// Execution reaches the first instruction of a source line
    Line = 5,
    /// Any instruction is about to execute
    Instruction = 6,
    /// An unconditional jump
    Jump = 7,
    /// A conditional branch, taken or not
    Branch = 8,
    /// A call site invokes a native callable
    NativeCall = 9,
    /// A native callable returned normally
    NativeReturn = 10,
    /// An exception is raised
    Raise = 11,
    /// An exception is caught by a handler
    ExceptionHandled = 12,
    /// A frame is exited by an exception
    Unwind = 13,
    /// A generator is resumed with an exception
    Throw = 14,
    /// Execution reaches a marker
    Marker = 15,
}

impl EventKind {
    /// Number of defined kinds
    pub const COUNT: usize = 16;

    /// Every kind in bit order
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Start,
        EventKind::Resume,
        EventKind::Return,
        EventKind::Yield,
        EventKind::Call,
        EventKind::Line,
        EventKind::Instruction,
        EventKind::Jump,
        EventKind::Branch,
        EventKind::NativeCall,
        EventKind::NativeReturn,
        EventKind::Raise,
        EventKind::ExceptionHandled,
        EventKind::Unwind,
        EventKind::Throw,
        EventKind::Marker,
    ];

    /// Stable bit index of this kind
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Kind for a bit index, if one is defined
    pub fn from_index(index: usize) -> Option<EventKind> {
        Self::ALL.get(index).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Resume => "resume",
            EventKind::Return => "return",
            EventKind::Yield => "yield",
            EventKind::Call => "call",
            EventKind::Line => "line",
            EventKind::Instruction => "instruction",
            EventKind::Jump => "jump",
            EventKind::Branch => "branch",
            EventKind::NativeCall => "native_call",
            EventKind::NativeReturn => "native_return",
            EventKind::Raise => "raise",
            EventKind::ExceptionHandled => "exception_handled",
            EventKind::Unwind => "unwind",
            EventKind::Throw => "throw",
            EventKind::Marker => "marker",
        }
    }

    /// Whether activating this kind requires traps in the executable form
    pub const fn requires_instrumentation(self) -> bool {
        EventSet::INSTRUMENTED.contains(self)
    }

    /// Whether this kind may appear in an activation set
    pub const fn is_activatable(self) -> bool {
        !matches!(self, EventKind::Marker)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| MonitorError::InvalidArgument(format!("unknown event kind: {}", wanted)))
    }
}

/// A set of event kinds stored as a bitset
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u32);

impl EventSet {
    pub const EMPTY: EventSet = EventSet(0);

    /// Every defined kind, including `marker`
    pub const ALL: EventSet = EventSet((1 << EventKind::COUNT) - 1);

    /// Kinds that may be named in an activation set
    pub const ACTIVATABLE: EventSet = EventSet(Self::ALL.0 & !EventKind::Marker.bit());

    /// Kinds that need traps placed in code
    pub const INSTRUMENTED: EventSet = EventSet(
        EventKind::Start.bit()
            | EventKind::Resume.bit()
            | EventKind::Return.bit()
            | EventKind::Yield.bit()
            | EventKind::Call.bit()
            | EventKind::Line.bit()
            | EventKind::Instruction.bit()
            | EventKind::Jump.bit()
            | EventKind::Branch.bit()
            | EventKind::NativeCall.bit()
            | EventKind::NativeReturn.bit(),
    );

    /// Kinds toggled at the point of occurrence without rewriting code
    pub const CHECK_ONLY: EventSet = EventSet(
        EventKind::Raise.bit()
            | EventKind::ExceptionHandled.bit()
            | EventKind::Unwind.bit()
            | EventKind::Throw.bit(),
    );

    /// Build a set from raw bits, rejecting bits with no defined kind
    pub fn from_bits(bits: u32) -> Result<EventSet, MonitorError> {
        if bits & !Self::ALL.0 != 0 {
            return Err(MonitorError::InvalidArgument(format!(
                "unknown event bits: {:#x}",
                bits & !Self::ALL.0
            )));
        }
        Ok(EventSet(bits))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: EventKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.0 &= !kind.bit();
    }

    pub const fn union(self, other: EventSet) -> EventSet {
        EventSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: EventSet) -> EventSet {
        EventSet(self.0 & other.0)
    }

    pub const fn difference(self, other: EventSet) -> EventSet {
        EventSet(self.0 & !other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate kinds in bit order
    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Check that every member may be activated
    pub fn validate_activatable(self) -> Result<(), MonitorError> {
        let rejected = self.difference(Self::ACTIVATABLE);
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::InvalidArgument(format!(
                "not activatable: {}",
                rejected
            )))
        }
    }
}

impl From<EventKind> for EventSet {
    fn from(kind: EventKind) -> Self {
        EventSet(kind.bit())
    }
}

impl FromIterator<EventKind> for EventSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut set = EventSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl BitOr for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: EventSet) -> EventSet {
        self.union(rhs)
    }
}

impl BitOr<EventKind> for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: EventKind) -> EventSet {
        self.union(rhs.into())
    }
}

impl BitOr for EventKind {
    type Output = EventSet;

    fn bitor(self, rhs: EventKind) -> EventSet {
        EventSet::from(self) | rhs
    }
}

impl BitOrAssign<EventKind> for EventSet {
    fn bitor_assign(&mut self, rhs: EventKind) {
        self.insert(rhs);
    }
}

impl BitAnd for EventSet {
    type Output = EventSet;

    fn bitand(self, rhs: EventSet) -> EventSet {
        self.intersection(rhs)
    }
}

impl Sub for EventSet {
    type Output = EventSet;

    fn sub(self, rhs: EventSet) -> EventSet {
        self.difference(rhs)
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(EventKind::name).collect();
        f.write_str(&names.join("|"))
    }
}

impl fmt::Debug for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventSet({})", self)
    }
}

/// Parses comma-separated kind names; `none` and the empty string are the empty set,
/// `all` is every activatable kind
impl FromStr for EventSet {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = EventSet::EMPTY;
        for part in s.split([',', '|']).map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "none" => {}
                "all" => set = set | EventSet::ACTIVATABLE,
                name => set.insert(name.parse()?),
            }
        }
        Ok(set)
    }
}

impl Serialize for EventSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for EventSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kinds = Vec::<EventKind>::deserialize(deserializer)?;
        Ok(kinds.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
