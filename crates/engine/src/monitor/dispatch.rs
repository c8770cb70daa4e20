// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback table and event payloads

use crate::frame::StackView;
use sonde_core::{ArgShape, CallbackError, CodeUnit, EventKind, Exception, MarkerId};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// Tool callback for one event kind
pub type Callback = Arc<dyn Fn(&MonitorEvent<'_>) -> Result<(), CallbackError> + Send + Sync>;

/// Wrap a closure as a [`Callback`]
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&MonitorEvent<'_>) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Kind-specific callback arguments
#[derive(Clone, Debug, PartialEq)]
pub enum EventArgs {
    Offset { offset: usize },
    Native { offset: usize, callable: Arc<str> },
    Exception { offset: usize, exception: Exception },
    Line { line: u32 },
    Jump { offset: usize, destination: usize },
    Marker { offset: usize, marker: MarkerId },
}

impl EventArgs {
    pub fn shape(&self) -> ArgShape {
        match self {
            EventArgs::Offset { .. } => ArgShape::Offset,
            EventArgs::Native { .. } => ArgShape::Native,
            EventArgs::Exception { .. } => ArgShape::Exception,
            EventArgs::Line { .. } => ArgShape::Line,
            EventArgs::Jump { .. } => ArgShape::Jump,
            EventArgs::Marker { .. } => ArgShape::Marker,
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            EventArgs::Offset { offset }
            | EventArgs::Native { offset, .. }
            | EventArgs::Exception { offset, .. }
            | EventArgs::Jump { offset, .. }
            | EventArgs::Marker { offset, .. } => Some(*offset),
            EventArgs::Line { .. } => None,
        }
    }
}

impl fmt::Display for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventArgs::Offset { offset } => write!(f, "offset={}", offset),
            EventArgs::Native { offset, callable } => {
                write!(f, "offset={} callable={}", offset, callable)
            }
            EventArgs::Exception { offset, exception } => {
                write!(f, "offset={} exception={}", offset, exception)
            }
            EventArgs::Line { line } => write!(f, "line={}", line),
            EventArgs::Jump {
                offset,
                destination,
            } => write!(f, "offset={} destination={}", offset, destination),
            EventArgs::Marker { offset, marker } => {
                write!(f, "offset={} marker={}", offset, marker)
            }
        }
    }
}

/// What a callback receives
pub struct MonitorEvent<'a> {
    pub kind: EventKind,
    pub unit: &'a Arc<CodeUnit>,
    pub args: EventArgs,
    /// Frames of the executing thread at the trap
    pub stack: StackView<'a>,
}

impl MonitorEvent<'_> {
    pub fn function(&self) -> &str {
        self.unit.name()
    }
}

impl fmt::Debug for MonitorEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorEvent")
            .field("kind", &self.kind)
            .field("unit", &self.unit.name())
            .field("args", &self.args)
            .field("depth", &self.stack.depth())
            .finish()
    }
}

/// One slot per event kind
pub(crate) struct CallbackTable {
    slots: [Option<Callback>; EventKind::COUNT],
}

impl Default for CallbackTable {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl CallbackTable {
    pub fn get(&self, kind: EventKind) -> Option<&Callback> {
        self.slots[kind.index()].as_ref()
    }

    /// Replace the slot for `kind`, returning the previous callback
    pub fn set(&mut self, kind: EventKind, callback: Option<Callback>) -> Option<Callback> {
        std::mem::replace(&mut self.slots[kind.index()], callback)
    }
}

thread_local! {
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// Clears the in-callback flag when the callback returns or unwinds
struct CallbackScope;

impl CallbackScope {
    fn enter() -> Option<CallbackScope> {
        IN_CALLBACK.with(|flag| (!flag.replace(true)).then_some(CallbackScope))
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        IN_CALLBACK.with(|flag| flag.set(false));
    }
}

/// Whether this thread is inside a callback
pub fn in_callback() -> bool {
    IN_CALLBACK.with(Cell::get)
}

/// Run `callback`, skipping it when this thread is already inside one.
///
/// An error becomes a `CallbackFault` exception.
pub(crate) fn invoke(callback: &Callback, event: &MonitorEvent<'_>) -> Result<(), Exception> {
    let Some(_scope) = CallbackScope::enter() else {
        return Ok(());
    };
    callback(event).map_err(|e| {
        tracing::debug!(
            kind = %event.kind,
            unit = event.unit.name(),
            error = %e,
            "callback failed"
        );
        Exception::callback_fault(event.kind, &e)
    })
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
