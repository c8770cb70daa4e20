// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executable units: bytecode, line tables, and the instrumented form
//!
//! A `CodeUnit` owns its original instruction array, which never changes.
//! Instrumentation lives in a separate `Executable` that the monitor rebuilds
//! and swaps in whole, so readers always see one consistent version.

use crate::executable::Executable;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use thiserror::Error;

/// Errors building a code unit or program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("unit {0} has no instructions")]
    Empty(String),
    #[error("unit {unit}: {lines} line entries for {instrs} instructions")]
    LineTableMismatch {
        unit: String,
        lines: usize,
        instrs: usize,
    },
    #[error("unit {unit}: jump at offset {offset} targets {target}, outside the unit")]
    BadTarget {
        unit: String,
        offset: usize,
        target: usize,
    },
    #[error("unit {unit}: local slot {slot} at offset {offset} exceeds {locals} locals")]
    BadSlot {
        unit: String,
        offset: usize,
        slot: u16,
        locals: u16,
    },
    #[error("unit {unit}: arity {arity} exceeds {locals} locals")]
    BadArity { unit: String, arity: u8, locals: u16 },
    #[error("unit {0}: last instruction must be return, raise, or jump")]
    FallsOffEnd(String),
    #[error("duplicate function: {0}")]
    DuplicateFunction(String),
    #[error("unit {unit} calls undefined function {callee}")]
    UndefinedFunction { unit: String, callee: String },
}

/// Literal operand of `push`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => write!(f, "none"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// One bytecode instruction. Jump targets are absolute offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Nop,
    Push(Constant),
    Load(u16),
    Store(u16),
    Pop,
    Dup,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Not,
    Jump(usize),
    JumpIfFalse(usize),
    JumpIfTrue(usize),
    Call { function: Arc<str>, argc: u8 },
    CallNative { native: Arc<str>, argc: u8 },
    Return,
    /// Create a suspended generator for `function` with `argc` arguments
    MakeGen { function: Arc<str>, argc: u8 },
    /// Advance the generator on top of the stack, or pop it and jump when exhausted
    ForIter(usize),
    Yield,
    /// Resume the generator below the top of stack by raising the top of stack in it
    Throw,
    Raise,
    /// Pop a message and push an exception of the given kind
    NewException(Arc<str>),
    /// Install a handler that jumps to the target when an exception is raised
    PushHandler(usize),
    PopHandler,
}

impl Instr {
    /// Static control-flow target, if the instruction has one
    pub fn target(&self) -> Option<usize> {
        match self {
            Instr::Jump(t)
            | Instr::JumpIfFalse(t)
            | Instr::JumpIfTrue(t)
            | Instr::ForIter(t)
            | Instr::PushHandler(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Instr::JumpIfFalse(_) | Instr::JumpIfTrue(_))
    }

    fn is_terminator(&self) -> bool {
        matches!(self, Instr::Return | Instr::Raise | Instr::Jump(_))
    }

    fn slot(&self) -> Option<u16> {
        match self {
            Instr::Load(s) | Instr::Store(s) => Some(*s),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instr::Nop => "nop",
            Instr::Push(_) => "push",
            Instr::Load(_) => "load",
            Instr::Store(_) => "store",
            Instr::Pop => "pop",
            Instr::Dup => "dup",
            Instr::Add => "add",
            Instr::Sub => "sub",
            Instr::Mul => "mul",
            Instr::Div => "div",
            Instr::Mod => "mod",
            Instr::Lt => "lt",
            Instr::Le => "le",
            Instr::Gt => "gt",
            Instr::Ge => "ge",
            Instr::Eq => "eq",
            Instr::Ne => "ne",
            Instr::Not => "not",
            Instr::Jump(_) => "jump",
            Instr::JumpIfFalse(_) => "jump_if_false",
            Instr::JumpIfTrue(_) => "jump_if_true",
            Instr::Call { .. } => "call",
            Instr::CallNative { .. } => "native",
            Instr::Return => "return",
            Instr::MakeGen { .. } => "gen",
            Instr::ForIter(_) => "for_iter",
            Instr::Yield => "yield",
            Instr::Throw => "throw",
            Instr::Raise => "raise",
            Instr::NewException(_) => "exception",
            Instr::PushHandler(_) => "try",
            Instr::PopHandler => "end_try",
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mnemonic();
        match self {
            Instr::Push(c) => write!(f, "{} {}", m, c),
            Instr::Load(s) | Instr::Store(s) => write!(f, "{} {}", m, s),
            Instr::Jump(t)
            | Instr::JumpIfFalse(t)
            | Instr::JumpIfTrue(t)
            | Instr::ForIter(t)
            | Instr::PushHandler(t) => write!(f, "{} {}", m, t),
            Instr::Call { function, argc } | Instr::MakeGen { function, argc } => {
                write!(f, "{} {} {}", m, function, argc)
            }
            Instr::CallNative { native, argc } => write!(f, "{} {} {}", m, native, argc),
            Instr::NewException(kind) => write!(f, "{} {}", m, kind),
            _ => f.write_str(m),
        }
    }
}

/// Process-unique identity of a code unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

impl UnitId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        UnitId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ids of dropped units, drained by the monitor that attached them
#[derive(Debug, Default)]
pub struct Retirements {
    ids: Mutex<Vec<UnitId>>,
}

impl Retirements {
    pub fn new() -> Self {
        Self::default()
    }

    fn retire(&self, id: UnitId) {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).push(id);
    }

    pub fn drain(&self) -> Vec<UnitId> {
        std::mem::take(&mut *self.ids.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Compiled representation of one function body
pub struct CodeUnit {
    id: UnitId,
    name: Arc<str>,
    arity: u8,
    locals: u16,
    code: Arc<[Instr]>,
    lines: Arc<[u32]>,
    frozen: AtomicBool,
    executable: RwLock<Arc<Executable>>,
    owner: OnceLock<Arc<Retirements>>,
}

impl CodeUnit {
    pub fn new(
        name: impl Into<Arc<str>>,
        arity: u8,
        locals: u16,
        code: Vec<Instr>,
        lines: Vec<u32>,
    ) -> Result<Self, CodeError> {
        let name: Arc<str> = name.into();
        let unit = name.to_string();

        if code.is_empty() {
            return Err(CodeError::Empty(unit));
        }
        if lines.len() != code.len() {
            return Err(CodeError::LineTableMismatch {
                unit,
                lines: lines.len(),
                instrs: code.len(),
            });
        }
        if u16::from(arity) > locals {
            return Err(CodeError::BadArity {
                unit,
                arity,
                locals,
            });
        }
        for (offset, instr) in code.iter().enumerate() {
            if let Some(target) = instr.target() {
                if target >= code.len() {
                    return Err(CodeError::BadTarget {
                        unit,
                        offset,
                        target,
                    });
                }
            }
            if let Some(slot) = instr.slot() {
                if slot >= locals {
                    return Err(CodeError::BadSlot {
                        unit,
                        offset,
                        slot,
                        locals,
                    });
                }
            }
        }
        if !code.last().is_some_and(Instr::is_terminator) {
            return Err(CodeError::FallsOffEnd(unit));
        }

        Ok(Self {
            id: UnitId::next(),
            name,
            arity,
            locals,
            code: code.into(),
            lines: lines.into(),
            frozen: AtomicBool::new(false),
            executable: RwLock::new(Arc::new(Executable::idle())),
            owner: OnceLock::new(),
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }

    pub fn locals(&self) -> u16 {
        self.locals
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Original, uninstrumented instructions
    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    pub fn instr(&self, offset: usize) -> Option<&Instr> {
        self.code.get(offset)
    }

    /// Source line of the instruction at `offset`
    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    /// Whether `offset` is the first instruction of a source line
    pub fn starts_line(&self, offset: usize) -> bool {
        match offset {
            0 => !self.lines.is_empty(),
            n => n < self.lines.len() && self.lines[n] != self.lines[n - 1],
        }
    }

    /// Current executable form
    pub fn executable(&self) -> Arc<Executable> {
        Arc::clone(&self.executable.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Swap in a new executable form, returning the old one.
    ///
    /// Called by the monitor's rewriter after a change has been planned for
    /// every affected unit.
    pub fn install(&self, executable: Arc<Executable>) -> Arc<Executable> {
        let mut current = self.executable.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, executable)
    }

    /// Forbid further rewrites of this unit
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn thaw(&self) {
        self.frozen.store(false, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Tie this unit's lifetime to a monitor. Returns false if the unit is
    /// already attached to a different one.
    pub fn attach(&self, retirements: &Arc<Retirements>) -> bool {
        let owner = self.owner.get_or_init(|| Arc::clone(retirements));
        Arc::ptr_eq(owner, retirements)
    }
}

impl Drop for CodeUnit {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.get() {
            owner.retire(self.id);
        }
    }
}

impl fmt::Debug for CodeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("len", &self.code.len())
            .finish()
    }
}

/// A set of named code units
#[derive(Debug, Clone, Default)]
pub struct Program {
    units: Vec<Arc<CodeUnit>>,
    by_name: HashMap<String, usize>,
}

impl Program {
    /// Build a program, checking names are unique and every call resolves
    pub fn new(units: Vec<CodeUnit>) -> Result<Self, CodeError> {
        let mut by_name = HashMap::new();
        for (index, unit) in units.iter().enumerate() {
            if by_name.insert(unit.name().to_string(), index).is_some() {
                return Err(CodeError::DuplicateFunction(unit.name().to_string()));
            }
        }
        for unit in &units {
            for instr in unit.code() {
                if let Instr::Call { function, .. } | Instr::MakeGen { function, .. } = instr {
                    if !by_name.contains_key(&**function) {
                        return Err(CodeError::UndefinedFunction {
                            unit: unit.name().to_string(),
                            callee: function.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Self {
            units: units.into_iter().map(Arc::new).collect(),
            by_name,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CodeUnit>> {
        self.by_name.get(name).map(|&i| &self.units[i])
    }

    pub fn units(&self) -> &[Arc<CodeUnit>] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
#[path = "code_tests.rs"]
mod tests;
