// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instrumentation rewriter
//!
//! Builds a unit's executable form from its effective event set and markers.
//! Changes are planned for every affected unit first and only installed once
//! all of them succeeded, so a failure leaves every unit untouched.

use sonde_core::{
    CodeUnit, EventKind, EventSet, Executable, Instr, MarkerId, MonitorError, Trap,
};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

thread_local! {
    /// Plans that installed at least one executable on this thread
    static COMMITTED: Cell<u64> = const { Cell::new(0) };
}

/// Number of rewrites committed by the calling thread
pub(crate) fn committed_here() -> u64 {
    COMMITTED.with(Cell::get)
}

/// Whether an instruction is a trap site for `kind`
fn is_site(unit: &CodeUnit, offset: usize, instr: &Instr, kind: EventKind) -> bool {
    match kind {
        EventKind::Start => offset == 0,
        EventKind::Resume | EventKind::Yield => matches!(instr, Instr::Yield),
        EventKind::Return => matches!(instr, Instr::Return),
        EventKind::Call => matches!(instr, Instr::Call { .. }),
        EventKind::Line => unit.starts_line(offset),
        EventKind::Instruction => true,
        EventKind::Jump => matches!(instr, Instr::Jump(_)),
        EventKind::Branch => instr.is_branch(),
        EventKind::NativeCall | EventKind::NativeReturn => {
            matches!(instr, Instr::CallNative { .. })
        }
        EventKind::Raise
        | EventKind::ExceptionHandled
        | EventKind::Unwind
        | EventKind::Throw
        | EventKind::Marker => false,
    }
}

/// Offsets where `kind` places a trap
pub(crate) fn sites(unit: &CodeUnit, kind: EventKind) -> Vec<usize> {
    unit.code()
        .iter()
        .enumerate()
        .filter(|(offset, instr)| is_site(unit, *offset, instr, kind))
        .map(|(offset, _)| offset)
        .collect()
}

/// Executable form of `unit` for `events` and `markers`
pub(crate) fn build(
    unit: &CodeUnit,
    events: EventSet,
    markers: Option<&BTreeMap<usize, MarkerId>>,
    version: u64,
) -> Executable {
    let instrumented = events.intersection(EventSet::INSTRUMENTED);
    if instrumented.is_empty() && markers.is_none_or(BTreeMap::is_empty) {
        return Executable::new(version, events, Vec::new());
    }

    let traps = unit
        .code()
        .iter()
        .enumerate()
        .map(|(offset, instr)| {
            let trap = Trap {
                events: instrumented
                    .iter()
                    .filter(|kind| is_site(unit, offset, instr, *kind))
                    .collect(),
                marker: markers.and_then(|m| m.get(&offset).copied()),
            };
            (!trap.is_empty()).then_some(trap)
        })
        .collect();
    Executable::new(version, events, traps)
}

/// Executables staged for installation
#[derive(Default)]
pub(crate) struct RewritePlan {
    staged: Vec<(Arc<CodeUnit>, Arc<Executable>)>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a rebuild of `unit`.
    ///
    /// Units whose layout would not change are skipped. A frozen unit only
    /// accepts changes to its check-only event set; a change to its trap
    /// table fails the whole plan.
    pub fn stage(
        &mut self,
        unit: &Arc<CodeUnit>,
        events: EventSet,
        markers: Option<&BTreeMap<usize, MarkerId>>,
        version: u64,
    ) -> Result<(), MonitorError> {
        let next = build(unit, events, markers, version);
        let current = unit.executable();
        if current.same_layout(&next) {
            return Ok(());
        }
        if unit.is_frozen() && !current.same_traps(&next) {
            return Err(MonitorError::RewriteFailure {
                unit: unit.name().to_string(),
                reason: "unit is frozen".to_string(),
            });
        }
        self.staged.push((Arc::clone(unit), Arc::new(next)));
        Ok(())
    }

    /// Install every staged executable, returning how many units changed
    pub fn commit(self) -> usize {
        let count = self.staged.len();
        tracing::trace!(units = count, "committing rewrite plan");
        for (unit, executable) in self.staged {
            tracing::trace!(
                unit = unit.name(),
                version = executable.version(),
                traps = executable.trap_count(),
                "installing executable"
            );
            unit.install(executable);
        }
        if count > 0 {
            COMMITTED.with(|c| c.set(c.get().wrapping_add(1)));
        }
        count
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
