// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bytecode interpreter
//!
//! Each frame pins the executable it last read from its unit. The pin is
//! refreshed at frame entry, generator resume and backward jumps, so a frame
//! never observes a half-applied instrumentation change. Rewrites made on the
//! running thread, from a callback or a callee, are also picked up once the
//! callback returns or the callee returns into the frame.

use crate::error::VmError;
use crate::frame::{Frame, FrameKind, Handler, StackView};
use crate::legacy::{LegacyHooks, ProfileEvent, TraceEvent};
use crate::monitor::{EventArgs, Monitor};
use crate::native::Natives;
use crate::value::{self, Generator, Value};
use serde::{Deserialize, Serialize};
use sonde_core::{CodeUnit, EventKind, Exception, Instr, Program, Trap};
use std::sync::Arc;

/// Interpreter limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum number of frames on one thread
    pub max_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

enum Step {
    Continue,
    Done(Value),
}

/// A loaded program bound to a monitor. Shareable across threads.
pub struct Vm {
    program: Program,
    natives: Natives,
    monitor: Arc<Monitor>,
    config: VmConfig,
}

impl Vm {
    /// Load `program`, attaching every unit to `monitor`
    pub fn new(program: Program, monitor: Arc<Monitor>) -> Result<Self, VmError> {
        for unit in program.units() {
            monitor.attach(unit)?;
        }
        Ok(Self {
            program,
            natives: Natives::builtins(),
            monitor,
            config: VmConfig::default(),
        })
    }

    pub fn with_natives(mut self, natives: Natives) -> Self {
        self.natives = natives;
        self
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn unit(&self, name: &str) -> Option<&Arc<CodeUnit>> {
        self.program.get(name)
    }

    /// Run `name` to completion on the calling thread
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, VmError> {
        let unit = self
            .program
            .get(name)
            .ok_or_else(|| VmError::UnknownFunction(name.to_string()))?;
        if args.len() != usize::from(unit.arity()) {
            return Err(VmError::Arity {
                function: name.to_string(),
                expected: unit.arity(),
                got: args.len(),
            });
        }

        let span = tracing::debug_span!("call", function = name);
        let _guard = span.enter();

        if let Some(result) = self
            .monitor
            .legacy_hooks()
            .and_then(|hooks| hooks.eval_override.clone())
            .and_then(|eval| eval(unit.as_ref(), args.as_slice()))
        {
            return result.map_err(VmError::Uncaught);
        }

        let mut frames = vec![Frame::new(Arc::clone(unit), args, FrameKind::Entry)];
        let result = self.run(&mut frames);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "call failed");
        }
        result
    }

    fn run(&self, frames: &mut Vec<Frame>) -> Result<Value, VmError> {
        loop {
            match self.step(frames) {
                Ok(Step::Continue) => {}
                Ok(Step::Done(value)) => return Ok(value),
                Err(exception) => self.raise(frames, exception)?,
            }
        }
    }

    fn step(&self, frames: &mut Vec<Frame>) -> Result<Step, Exception> {
        let frame = frames.last_mut().ok_or_else(|| internal("no frame"))?;
        let unit = Arc::clone(&frame.unit);
        let ip = frame.ip;
        let instr = unit
            .instr(ip)
            .ok_or_else(|| internal(&format!("offset {} outside {}", ip, unit.name())))?;
        let first = !frame.started;
        frame.started = true;
        let trap = frame.exec.trap(ip).copied();

        if let Some(trap) = trap {
            self.fire_trap(frames, &unit, ip, instr, trap, first)?;
        }
        let legacy = self.monitor.legacy_hooks();
        if let Some(hooks) = &legacy {
            legacy_step(frames, &unit, ip, hooks);
        }
        self.execute(frames, &unit, ip, instr, legacy.as_deref())
    }

    /// Fire the events armed at `ip`, before the instruction executes
    fn fire_trap(
        &self,
        frames: &mut [Frame],
        unit: &Arc<CodeUnit>,
        ip: usize,
        instr: &Instr,
        trap: Trap,
        first: bool,
    ) -> Result<(), Exception> {
        let events = trap.events;
        if first && events.contains(EventKind::Start) {
            self.emit(frames, unit, EventKind::Start, EventArgs::Offset { offset: ip })?;
        }
        if events.contains(EventKind::Line) {
            if let Some(line) = unit.line_at(ip) {
                self.emit(frames, unit, EventKind::Line, EventArgs::Line { line })?;
            }
        }
        if events.contains(EventKind::Instruction) {
            self.emit(frames, unit, EventKind::Instruction, EventArgs::Offset { offset: ip })?;
        }

        let own = match instr {
            Instr::Call { .. } if events.contains(EventKind::Call) => {
                Some((EventKind::Call, EventArgs::Offset { offset: ip }))
            }
            Instr::CallNative { native, .. } if events.contains(EventKind::NativeCall) => Some((
                EventKind::NativeCall,
                EventArgs::Native {
                    offset: ip,
                    callable: Arc::clone(native),
                },
            )),
            Instr::Return if events.contains(EventKind::Return) => {
                Some((EventKind::Return, EventArgs::Offset { offset: ip }))
            }
            Instr::Yield if events.contains(EventKind::Yield) => {
                Some((EventKind::Yield, EventArgs::Offset { offset: ip }))
            }
            Instr::Jump(target) if events.contains(EventKind::Jump) => Some((
                EventKind::Jump,
                EventArgs::Jump {
                    offset: ip,
                    destination: *target,
                },
            )),
            Instr::JumpIfFalse(target) | Instr::JumpIfTrue(target)
                if events.contains(EventKind::Branch) =>
            {
                let taken = frames
                    .last()
                    .and_then(|f| f.stack.last())
                    .is_some_and(|c| c.truthy() == matches!(instr, Instr::JumpIfTrue(_)));
                let destination = if taken { *target } else { ip + 1 };
                Some((
                    EventKind::Branch,
                    EventArgs::Jump {
                        offset: ip,
                        destination,
                    },
                ))
            }
            _ => None,
        };
        if let Some((kind, args)) = own {
            self.emit(frames, unit, kind, args)?;
        }

        if let Some(marker) = trap.marker {
            self.emit(frames, unit, EventKind::Marker, EventArgs::Marker { offset: ip, marker })?;
        }
        Ok(())
    }

    fn emit(
        &self,
        frames: &mut [Frame],
        unit: &Arc<CodeUnit>,
        kind: EventKind,
        args: EventArgs,
    ) -> Result<(), Exception> {
        let result = self.monitor.dispatch(kind, unit, args, StackView::new(frames));
        if let Some(frame) = frames.last_mut() {
            frame.sync();
        }
        result
    }

    fn execute(
        &self,
        frames: &mut Vec<Frame>,
        unit: &Arc<CodeUnit>,
        ip: usize,
        instr: &Instr,
        legacy: Option<&LegacyHooks>,
    ) -> Result<Step, Exception> {
        let top = frames.len() - 1;
        let frame = &mut frames[top];
        match instr {
            Instr::Nop => frame.ip += 1,
            Instr::Push(constant) => {
                frame.push(Value::from(constant));
                frame.ip += 1;
            }
            Instr::Load(slot) => {
                let value = frame.locals[usize::from(*slot)].clone();
                frame.push(value);
                frame.ip += 1;
            }
            Instr::Store(slot) => {
                let value = frame.pop()?;
                frame.locals[usize::from(*slot)] = value;
                frame.ip += 1;
            }
            Instr::Pop => {
                frame.pop()?;
                frame.ip += 1;
            }
            Instr::Dup => {
                let value = frame.peek()?.clone();
                frame.push(value);
                frame.ip += 1;
            }
            Instr::Not => {
                let value = frame.pop()?;
                frame.push(Value::Bool(!value.truthy()));
                frame.ip += 1;
            }
            Instr::Add
            | Instr::Sub
            | Instr::Mul
            | Instr::Div
            | Instr::Mod
            | Instr::Lt
            | Instr::Le
            | Instr::Gt
            | Instr::Ge
            | Instr::Eq
            | Instr::Ne => {
                let b = frame.pop()?;
                let a = frame.pop()?;
                frame.push(value::apply(instr, a, b)?);
                frame.ip += 1;
            }
            Instr::Jump(target) => frame.jump(*target),
            Instr::JumpIfFalse(target) | Instr::JumpIfTrue(target) => {
                let condition = frame.pop()?;
                if condition.truthy() == matches!(instr, Instr::JumpIfTrue(_)) {
                    frame.jump(*target);
                } else {
                    frame.ip += 1;
                }
            }
            Instr::Call { function, argc } => {
                return self.call_function(frames, function, *argc, legacy);
            }
            Instr::CallNative { native, argc } => {
                return self.call_native(frames, unit, ip, native, *argc, legacy);
            }
            Instr::Return => return self.return_from(frames, unit, ip, legacy),
            Instr::MakeGen { function, argc } => {
                let callee = self.resolve(function)?;
                let args = frame.pop_n(usize::from(*argc))?;
                check_arity(&callee, args.len())?;
                let generator = Generator::new(Frame::new(callee, args, FrameKind::Suspended));
                frame.push(Value::Generator(generator));
                frame.ip += 1;
            }
            Instr::ForIter(exit) => self.for_iter(frames, *exit)?,
            Instr::Yield => return self.yield_from(frames, unit, ip, legacy),
            Instr::Throw => self.throw(frames)?,
            Instr::Raise => return Err(frame.pop()?.into_exception()),
            Instr::NewException(kind) => {
                let message = match frame.pop()? {
                    Value::None => String::new(),
                    other => other.to_string(),
                };
                frame.push(Value::exception(Exception::new(kind.to_string(), message)));
                frame.ip += 1;
            }
            Instr::PushHandler(target) => {
                let depth = frame.stack.len();
                frame.handlers.push(Handler {
                    target: *target,
                    depth,
                });
                frame.ip += 1;
            }
            Instr::PopHandler => {
                frame.handlers.pop();
                frame.ip += 1;
            }
        }
        Ok(Step::Continue)
    }

    fn resolve(&self, function: &str) -> Result<Arc<CodeUnit>, Exception> {
        self.program.get(function).cloned().ok_or_else(|| {
            Exception::new("NameError", format!("function {} is not defined", function))
        })
    }

    fn check_depth(&self, frames: &[Frame]) -> Result<(), Exception> {
        if frames.len() >= self.config.max_depth {
            return Err(Exception::new(
                "RecursionError",
                format!("maximum call depth {} exceeded", self.config.max_depth),
            ));
        }
        Ok(())
    }

    fn call_function(
        &self,
        frames: &mut Vec<Frame>,
        function: &str,
        argc: u8,
        legacy: Option<&LegacyHooks>,
    ) -> Result<Step, Exception> {
        let callee = self.resolve(function)?;
        self.check_depth(frames)?;
        let top = frames.len() - 1;
        let args = frames[top].pop_n(usize::from(argc))?;
        check_arity(&callee, args.len())?;

        let overridden = legacy
            .and_then(|hooks| hooks.eval_override.as_ref())
            .and_then(|eval| eval(callee.as_ref(), args.as_slice()));
        if let Some(result) = overridden {
            let caller = &mut frames[top];
            caller.push(result?);
            caller.ip += 1;
            return Ok(Step::Continue);
        }

        frames.push(Frame::new(callee, args, FrameKind::Call));
        Ok(Step::Continue)
    }

    fn call_native(
        &self,
        frames: &mut [Frame],
        unit: &Arc<CodeUnit>,
        ip: usize,
        native: &Arc<str>,
        argc: u8,
        legacy: Option<&LegacyHooks>,
    ) -> Result<Step, Exception> {
        let f = self.natives.get(native).cloned().ok_or_else(|| {
            Exception::new("NameError", format!("native {} is not defined", native))
        })?;
        let top = frames.len() - 1;
        let args = frames[top].pop_n(usize::from(argc))?;

        if let Some(hooks) = legacy {
            hooks.profile(unit, ip, ProfileEvent::NativeCall(Arc::clone(native)));
        }
        let result = f(args.as_slice());
        if let Some(hooks) = legacy {
            hooks.profile(unit, ip, ProfileEvent::NativeReturn(Arc::clone(native)));
        }
        let value = result?;

        let armed = frames[top]
            .exec
            .trap(ip)
            .is_some_and(|t| t.events.contains(EventKind::NativeReturn));
        if armed {
            let args = EventArgs::Native {
                offset: ip,
                callable: Arc::clone(native),
            };
            self.emit(frames, unit, EventKind::NativeReturn, args)?;
        }

        let frame = &mut frames[top];
        frame.push(value);
        frame.ip += 1;
        Ok(Step::Continue)
    }

    fn return_from(
        &self,
        frames: &mut Vec<Frame>,
        unit: &Arc<CodeUnit>,
        ip: usize,
        legacy: Option<&LegacyHooks>,
    ) -> Result<Step, Exception> {
        let top = frames.len() - 1;
        let value = frames[top].pop()?;
        if let Some(hooks) = legacy {
            hooks.trace(unit, ip, TraceEvent::Return);
            hooks.profile(unit, ip, ProfileEvent::Return);
        }

        let frame = frames.pop().ok_or_else(|| internal("no frame"))?;
        match frame.kind {
            FrameKind::Entry => Ok(Step::Done(value)),
            FrameKind::Call => {
                let caller = frames.last_mut().ok_or_else(|| internal("no caller"))?;
                caller.sync();
                caller.push(value);
                caller.ip += 1;
                Ok(Step::Continue)
            }
            FrameKind::Generator(generator) => {
                generator.finish();
                let caller = frames.last_mut().ok_or_else(|| internal("no caller"))?;
                caller.sync();
                match caller.unit.instr(caller.ip) {
                    Some(Instr::ForIter(exit)) => {
                        let exit = *exit;
                        caller.pop()?;
                        caller.jump(exit);
                    }
                    _ => {
                        caller.push(Value::None);
                        caller.ip += 1;
                    }
                }
                Ok(Step::Continue)
            }
            FrameKind::Suspended => Err(internal("return from a suspended frame")),
        }
    }

    fn yield_from(
        &self,
        frames: &mut Vec<Frame>,
        unit: &Arc<CodeUnit>,
        ip: usize,
        legacy: Option<&LegacyHooks>,
    ) -> Result<Step, Exception> {
        let top = frames.len() - 1;
        if !matches!(frames[top].kind, FrameKind::Generator(_)) {
            return Err(Exception::new("RuntimeError", "yield outside a generator"));
        }
        let value = frames[top].pop()?;
        if let Some(hooks) = legacy {
            hooks.trace(unit, ip, TraceEvent::Return);
        }

        let mut frame = frames.pop().ok_or_else(|| internal("no frame"))?;
        frame.ip = ip + 1;
        frame.suspended_at = Some(ip);
        frame.entered = false;
        if let FrameKind::Generator(generator) =
            std::mem::replace(&mut frame.kind, FrameKind::Suspended)
        {
            generator.suspend(frame);
        }

        let caller = frames.last_mut().ok_or_else(|| internal("no caller"))?;
        caller.sync();
        caller.push(value);
        caller.ip += 1;
        Ok(Step::Continue)
    }

    fn for_iter(&self, frames: &mut Vec<Frame>, exit: usize) -> Result<(), Exception> {
        let top = frames.len() - 1;
        let generator = match frames[top].peek()? {
            Value::Generator(g) => g.clone(),
            other => {
                return Err(Exception::type_error(format!(
                    "cannot iterate a {} value",
                    other.type_name()
                )))
            }
        };
        match generator.take_frame()? {
            Some(frame) => self.resume(frames, generator, frame, None),
            None => {
                let caller = &mut frames[top];
                caller.pop()?;
                caller.jump(exit);
                Ok(())
            }
        }
    }

    fn throw(&self, frames: &mut Vec<Frame>) -> Result<(), Exception> {
        let top = frames.len() - 1;
        let thrown = frames[top].pop()?.into_exception();
        let Value::Generator(generator) = frames[top].pop()? else {
            return Err(Exception::type_error("throw target is not a generator"));
        };
        match generator.take_frame()? {
            Some(frame) => self.resume(frames, generator, frame, Some(thrown)),
            None => Err(thrown),
        }
    }

    /// Push a generator frame back on the stack. A thrown exception is
    /// returned as an error so the caller raises it inside the generator.
    fn resume(
        &self,
        frames: &mut Vec<Frame>,
        generator: Generator,
        mut frame: Frame,
        thrown: Option<Exception>,
    ) -> Result<(), Exception> {
        if let Err(e) = self.check_depth(frames) {
            generator.suspend(frame);
            return Err(e);
        }
        frame.refresh();
        frame.kind = FrameKind::Generator(generator);
        let resumed_at = frame.suspended_at.take();
        if resumed_at.is_some() && thrown.is_none() {
            // Value of the yield expression
            frame.push(Value::None);
        }
        frames.push(frame);

        let top = frames.len() - 1;
        let unit = Arc::clone(&frames[top].unit);
        let offset = frames[top].ip;
        match thrown {
            Some(exception) => {
                frames[top].started = true;
                if frames[top].exec.events().contains(EventKind::Throw) {
                    self.emit(frames, &unit, EventKind::Throw, EventArgs::Offset { offset })?;
                }
                Err(exception)
            }
            None => {
                let armed = resumed_at.is_some_and(|at| {
                    frames[top]
                        .exec
                        .trap(at)
                        .is_some_and(|t| t.events.contains(EventKind::Resume))
                });
                if armed {
                    self.emit(frames, &unit, EventKind::Resume, EventArgs::Offset { offset })?;
                }
                Ok(())
            }
        }
    }

    /// Propagate `exception` from the innermost frame to a handler, or out
    fn raise(&self, frames: &mut Vec<Frame>, mut exception: Exception) -> Result<(), VmError> {
        let legacy = self.monitor.legacy_hooks();
        if let Some(frame) = frames.last() {
            let unit = Arc::clone(&frame.unit);
            let offset = frame.ip;
            tracing::trace!(unit = unit.name(), offset, exception = %exception, "raise");
            if frame.exec.events().contains(EventKind::Raise) {
                let args = EventArgs::Exception {
                    offset,
                    exception: exception.clone(),
                };
                if let Err(fault) = self.emit(frames, &unit, EventKind::Raise, args) {
                    exception = fault;
                }
            }
            if let Some(hooks) = &legacy {
                hooks.trace(&unit, offset, TraceEvent::Exception(exception.clone()));
            }
        }

        while let Some(top) = frames.len().checked_sub(1) {
            let unit = Arc::clone(&frames[top].unit);

            if let Some(handler) = frames[top].handlers.pop() {
                let frame = &mut frames[top];
                frame.stack.truncate(handler.depth);
                frame.push(Value::exception(exception.clone()));
                frame.jump(handler.target);
                if frame.exec.events().contains(EventKind::ExceptionHandled) {
                    let args = EventArgs::Exception {
                        offset: handler.target,
                        exception,
                    };
                    if let Err(fault) = self.emit(frames, &unit, EventKind::ExceptionHandled, args)
                    {
                        frames[top].stack.pop();
                        exception = fault;
                        continue;
                    }
                }
                return Ok(());
            }

            let offset = frames[top].ip;
            if frames[top].exec.events().contains(EventKind::Unwind) {
                if let Err(fault) =
                    self.emit(frames, &unit, EventKind::Unwind, EventArgs::Offset { offset })
                {
                    exception = fault;
                }
            }
            if let Some(hooks) = &legacy {
                hooks.trace(&unit, offset, TraceEvent::Return);
                hooks.profile(&unit, offset, ProfileEvent::Return);
            }

            if let Some(frame) = frames.pop() {
                match frame.kind {
                    FrameKind::Entry => break,
                    FrameKind::Generator(generator) => generator.finish(),
                    FrameKind::Call | FrameKind::Suspended => {}
                }
            }
            if let Some(caller) = frames.last_mut() {
                caller.sync();
            }
        }
        Err(VmError::Uncaught(exception))
    }
}

/// Report legacy call and line events before an instruction executes
fn legacy_step(frames: &mut [Frame], unit: &CodeUnit, ip: usize, hooks: &LegacyHooks) {
    let Some(frame) = frames.last_mut() else {
        return;
    };
    if !frame.entered {
        frame.entered = true;
        hooks.trace(unit, ip, TraceEvent::Call);
        hooks.profile(unit, ip, ProfileEvent::Call);
    }
    if unit.starts_line(ip) {
        if let Some(line) = unit.line_at(ip) {
            hooks.trace(unit, ip, TraceEvent::Line(line));
        }
    }
}

fn check_arity(unit: &CodeUnit, got: usize) -> Result<(), Exception> {
    if got != usize::from(unit.arity()) {
        return Err(Exception::type_error(format!(
            "{} takes {} arguments, got {}",
            unit.name(),
            unit.arity(),
            got
        )));
    }
    Ok(())
}

fn internal(message: &str) -> Exception {
    Exception::new("InternalError", message)
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "interp_events_tests.rs"]
mod event_tests;
