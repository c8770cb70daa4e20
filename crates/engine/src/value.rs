// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime values and generator objects

use crate::frame::Frame;
use sonde_core::{Constant, Exception, Instr};
use std::fmt;
use std::sync::{Arc, Mutex};

/// A value on the operand stack or in a local slot
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Exception(Arc<Exception>),
    Generator(Generator),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn exception(exception: Exception) -> Self {
        Value::Exception(Arc::new(exception))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Exception(_) | Value::Generator(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Exception(_) => "exception",
            Value::Generator(_) => "generator",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert a raised operand into an exception
    pub(crate) fn into_exception(self) -> Exception {
        match self {
            Value::Exception(e) => Arc::unwrap_or_clone(e),
            Value::Str(s) => Exception::new("Error", s.to_string()),
            other => Exception::type_error(format!(
                "cannot raise a {} value",
                other.type_name()
            )),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (Value::Generator(a), Value::Generator(b)) => Arc::ptr_eq(&a.state, &b.state),
            _ => false,
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(n) => Value::Int(*n),
            Constant::Str(s) => Value::Str(Arc::clone(s)),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Exception(e) => write!(f, "{}", e),
            Value::Generator(g) => write!(f, "<generator {}>", g.function),
        }
    }
}

/// Apply a binary or unary operator instruction
pub(crate) fn apply(instr: &Instr, a: Value, b: Value) -> Result<Value, Exception> {
    use Value::{Int, Str};

    let mismatch = |a: &Value, b: &Value| {
        Exception::type_error(format!(
            "unsupported operands for {}: {} and {}",
            instr.mnemonic(),
            a.type_name(),
            b.type_name()
        ))
    };
    let overflow = || Exception::new("OverflowError", format!("{} overflowed", instr.mnemonic()));

    match (instr, &a, &b) {
        (Instr::Add, Int(x), Int(y)) => x.checked_add(*y).map(Int).ok_or_else(overflow),
        (Instr::Add, Str(x), Str(y)) => Ok(Value::str(&format!("{}{}", x, y))),
        (Instr::Sub, Int(x), Int(y)) => x.checked_sub(*y).map(Int).ok_or_else(overflow),
        (Instr::Mul, Int(x), Int(y)) => x.checked_mul(*y).map(Int).ok_or_else(overflow),
        (Instr::Div | Instr::Mod, Int(_), Int(0)) => Err(Exception::new(
            "ZeroDivisionError",
            format!("{} by zero", instr.mnemonic()),
        )),
        (Instr::Div, Int(x), Int(y)) => x.checked_div_euclid(*y).map(Int).ok_or_else(overflow),
        (Instr::Mod, Int(x), Int(y)) => x.checked_rem_euclid(*y).map(Int).ok_or_else(overflow),
        (Instr::Lt, Int(x), Int(y)) => Ok(Value::Bool(x < y)),
        (Instr::Le, Int(x), Int(y)) => Ok(Value::Bool(x <= y)),
        (Instr::Gt, Int(x), Int(y)) => Ok(Value::Bool(x > y)),
        (Instr::Ge, Int(x), Int(y)) => Ok(Value::Bool(x >= y)),
        (Instr::Lt, Str(x), Str(y)) => Ok(Value::Bool(x < y)),
        (Instr::Le, Str(x), Str(y)) => Ok(Value::Bool(x <= y)),
        (Instr::Gt, Str(x), Str(y)) => Ok(Value::Bool(x > y)),
        (Instr::Ge, Str(x), Str(y)) => Ok(Value::Bool(x >= y)),
        (Instr::Eq, _, _) => Ok(Value::Bool(a == b)),
        (Instr::Ne, _, _) => Ok(Value::Bool(a != b)),
        _ => Err(mismatch(&a, &b)),
    }
}

/// Execution state of a generator
pub(crate) enum GenState {
    Suspended(Box<Frame>),
    Running,
    Finished,
}

/// A suspendable function activation, shared by every value that holds it
#[derive(Clone)]
pub struct Generator {
    function: Arc<str>,
    state: Arc<Mutex<GenState>>,
}

impl Generator {
    pub(crate) fn new(frame: Frame) -> Self {
        Self {
            function: Arc::from(frame.unit.name()),
            state: Arc::new(Mutex::new(GenState::Suspended(Box::new(frame)))),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn is_finished(&self) -> bool {
        matches!(*self.lock(), GenState::Finished)
    }

    /// Take the suspended frame, marking the generator running.
    ///
    /// Returns `Ok(None)` once the generator has finished.
    pub(crate) fn take_frame(&self) -> Result<Option<Frame>, Exception> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, GenState::Running) {
            GenState::Suspended(frame) => Ok(Some(*frame)),
            GenState::Finished => {
                *state = GenState::Finished;
                Ok(None)
            }
            GenState::Running => Err(Exception::new(
                "ValueError",
                format!("generator {} already executing", self.function),
            )),
        }
    }

    pub(crate) fn suspend(&self, frame: Frame) {
        *self.lock() = GenState::Suspended(Box::new(frame));
    }

    pub(crate) fn finish(&self) {
        *self.lock() = GenState::Finished;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GenState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("function", &self.function)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
