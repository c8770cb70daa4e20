// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static catalog of event kinds and their callback argument shapes

use crate::event::EventKind;
use serde::Serialize;
use std::fmt;

/// The argument tuple a callback receives for an event kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgShape {
    /// `(unit, offset)`
    Offset,
    /// `(unit, offset, callable)`
    Native,
    /// `(unit, offset, exception)`
    Exception,
    /// `(unit, line)`
    Line,
    /// `(unit, offset, destination)`
    Jump,
    /// `(unit, offset, marker_id)`
    Marker,
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArgShape::Offset => "unit, offset",
            ArgShape::Native => "unit, offset, callable",
            ArgShape::Exception => "unit, offset, exception",
            ArgShape::Line => "unit, line",
            ArgShape::Jump => "unit, offset, destination",
            ArgShape::Marker => "unit, offset, marker_id",
        };
        f.write_str(s)
    }
}

/// Registry entry for one event kind
#[derive(Clone, Copy, Debug, Serialize)]
pub struct EventSpec {
    pub kind: EventKind,
    pub shape: ArgShape,
    /// Placed as traps by the rewriter, as opposed to checked where they occur
    pub instrumented: bool,
    pub summary: &'static str,
}

const fn spec(kind: EventKind, shape: ArgShape, summary: &'static str) -> EventSpec {
    EventSpec {
        kind,
        shape,
        instrumented: kind.requires_instrumentation(),
        summary,
    }
}

/// Indexed by `EventKind::index()`
static EVENTS: [EventSpec; EventKind::COUNT] = [
    spec(EventKind::Start, ArgShape::Offset, "function frame begins executing"),
    spec(EventKind::Resume, ArgShape::Offset, "generator frame is re-entered"),
    spec(EventKind::Return, ArgShape::Offset, "function is about to return"),
    spec(EventKind::Yield, ArgShape::Offset, "generator is about to yield"),
    spec(EventKind::Call, ArgShape::Offset, "call site invokes a function"),
    spec(EventKind::Line, ArgShape::Line, "first instruction of a source line"),
    spec(EventKind::Instruction, ArgShape::Offset, "instruction is about to execute"),
    spec(EventKind::Jump, ArgShape::Jump, "unconditional jump"),
    spec(EventKind::Branch, ArgShape::Jump, "conditional branch, taken or not"),
    spec(EventKind::NativeCall, ArgShape::Native, "call site invokes a native"),
    spec(EventKind::NativeReturn, ArgShape::Native, "native returned normally"),
    spec(EventKind::Raise, ArgShape::Exception, "exception raised"),
    spec(EventKind::ExceptionHandled, ArgShape::Exception, "exception caught by a handler"),
    spec(EventKind::Unwind, ArgShape::Offset, "frame exited by an exception"),
    spec(EventKind::Throw, ArgShape::Offset, "generator resumed with an exception"),
    spec(EventKind::Marker, ArgShape::Marker, "execution reached a marker"),
];

pub fn lookup(kind: EventKind) -> &'static EventSpec {
    &EVENTS[kind.index()]
}

pub fn all() -> &'static [EventSpec] {
    &EVENTS
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
