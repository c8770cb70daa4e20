// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listing of a unit's instructions with its current traps

use sonde_core::CodeUnit;
use std::fmt::Write;

/// Render `unit` as a listing, one instruction per row.
///
/// Rows that carry a trap in the unit's current executable are annotated
/// with the armed event kinds and marker.
pub fn disassemble(unit: &CodeUnit) -> String {
    let exe = unit.executable();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "fn {} arity={} locals={} version={}",
        unit.name(),
        unit.arity(),
        unit.locals(),
        exe.version()
    );
    for (offset, instr) in unit.code().iter().enumerate() {
        let line = match unit.line_at(offset) {
            Some(line) if unit.starts_line(offset) => line.to_string(),
            _ => String::new(),
        };
        let _ = write!(out, "{:>5} {:>5}  {}", line, offset, instr);
        if let Some(trap) = exe.trap(offset) {
            let mut notes = Vec::new();
            if !trap.events.is_empty() {
                notes.push(trap.events.to_string());
            }
            if let Some(marker) = trap.marker {
                notes.push(format!("marker={}", marker));
            }
            let _ = write!(out, "  ; {}", notes.join(" "));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "disasm_tests.rs"]
mod tests;
