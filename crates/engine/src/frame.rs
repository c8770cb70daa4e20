// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation records and the read-only stack view handed to callbacks

use crate::monitor::committed_here;
use crate::value::{Generator, Value};
use sonde_core::{CodeUnit, Exception, Executable};
use std::sync::Arc;

/// How a frame was entered, which decides where its result goes
pub(crate) enum FrameKind {
    /// Called by the host; returning ends the run
    Entry,
    /// Called from bytecode; the result is pushed on the caller's stack
    Call,
    /// Running generator body
    Generator(Generator),
    /// Parked inside its generator
    Suspended,
}

/// Active exception handler
#[derive(Clone, Copy, Debug)]
pub(crate) struct Handler {
    pub target: usize,
    pub depth: usize,
}

pub(crate) struct Frame {
    pub unit: Arc<CodeUnit>,
    /// Executable pinned at the last safepoint
    pub exec: Arc<Executable>,
    /// This thread's rewrite count when `exec` was pinned
    pinned_at: u64,
    pub ip: usize,
    pub locals: Vec<Value>,
    pub stack: Vec<Value>,
    pub handlers: Vec<Handler>,
    pub kind: FrameKind,
    /// Start has been reported for this frame
    pub started: bool,
    /// Legacy call has been reported since the last entry or resume
    pub entered: bool,
    /// Offset of the yield this frame is suspended at
    pub suspended_at: Option<usize>,
}

impl Frame {
    pub fn new(unit: Arc<CodeUnit>, args: Vec<Value>, kind: FrameKind) -> Self {
        let mut locals = args;
        locals.resize(usize::from(unit.locals()), Value::None);
        Self {
            exec: unit.executable(),
            pinned_at: committed_here(),
            unit,
            ip: 0,
            locals,
            stack: Vec::new(),
            handlers: Vec::new(),
            kind,
            started: false,
            entered: false,
            suspended_at: None,
        }
    }

    /// Re-read the unit's current executable
    pub fn refresh(&mut self) {
        self.pinned_at = committed_here();
        let current = self.unit.executable();
        if !Arc::ptr_eq(&self.exec, &current) {
            self.exec = current;
        }
    }

    /// Refresh if this thread rewrote anything since the last pin.
    ///
    /// Rewrites from other threads wait for the next safepoint.
    pub fn sync(&mut self) {
        if self.pinned_at != committed_here() {
            self.refresh();
        }
    }

    /// Move to `target`, refreshing at backward jumps
    pub fn jump(&mut self, target: usize) {
        if target <= self.ip {
            self.refresh();
        }
        self.ip = target;
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, Exception> {
        self.stack.pop().ok_or_else(|| self.underflow())
    }

    pub fn peek(&self) -> Result<&Value, Exception> {
        self.stack.last().ok_or_else(|| self.underflow())
    }

    /// Pop `n` values, oldest first
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Exception> {
        if self.stack.len() < n {
            return Err(self.underflow());
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn underflow(&self) -> Exception {
        Exception::new(
            "InternalError",
            format!("stack underflow in {} at offset {}", self.unit.name(), self.ip),
        )
    }
}

/// Read-only view of the executing thread's frames, innermost last
#[derive(Clone, Copy)]
pub struct StackView<'a> {
    frames: &'a [Frame],
}

impl<'a> StackView<'a> {
    pub(crate) fn new(frames: &'a [Frame]) -> Self {
        Self { frames }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Innermost frame
    pub fn top(&self) -> Option<FrameInfo<'a>> {
        self.frames.last().map(FrameInfo::new)
    }

    /// Frame at `index`, counting from the outermost
    pub fn frame(&self, index: usize) -> Option<FrameInfo<'a>> {
        self.frames.get(index).map(FrameInfo::new)
    }

    /// Frames from innermost to outermost
    pub fn frames(&self) -> impl Iterator<Item = FrameInfo<'a>> + 'a {
        self.frames.iter().rev().map(FrameInfo::new)
    }
}

/// One frame as seen from a callback
#[derive(Clone, Copy)]
pub struct FrameInfo<'a> {
    frame: &'a Frame,
}

impl<'a> FrameInfo<'a> {
    fn new(frame: &'a Frame) -> Self {
        Self { frame }
    }

    pub fn unit(&self) -> &'a Arc<CodeUnit> {
        &self.frame.unit
    }

    pub fn function(&self) -> &'a str {
        self.frame.unit.name()
    }

    pub fn offset(&self) -> usize {
        self.frame.ip
    }

    pub fn line(&self) -> Option<u32> {
        self.frame.unit.line_at(self.frame.ip)
    }

    pub fn locals(&self) -> &'a [Value] {
        &self.frame.locals
    }

    pub fn operands(&self) -> &'a [Value] {
        &self.frame.stack
    }
}
