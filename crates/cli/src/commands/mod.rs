// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod check;
pub mod disasm;
pub mod events;
pub mod run;

use crate::config::Config;
use anyhow::{Context, Result};
use sonde_adapters::{JsonlAuditLog, NoOpAuditHook, TracedAuditHook};
use sonde_core::{AuditHook, Program};
use sonde_engine::{Monitor, Vm};
use std::path::Path;
use std::sync::Arc;

/// Read and assemble a program file
pub fn load_program(path: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let program =
        sonde_asm::parse(&source).with_context(|| format!("failed to assemble {}", path.display()))?;
    tracing::debug!(path = %path.display(), functions = program.len(), "program loaded");
    Ok(program)
}

/// Monitor wired to the configured audit sink
pub fn monitor(config: &Config) -> Result<Arc<Monitor>> {
    let audit: Arc<dyn AuditHook> = match &config.audit.log {
        Some(path) => {
            let log = JsonlAuditLog::open(path)
                .with_context(|| format!("failed to open audit log {}", path.display()))?;
            Arc::new(TracedAuditHook::new(log))
        }
        None => Arc::new(TracedAuditHook::new(NoOpAuditHook::new())),
    };
    Ok(Arc::new(Monitor::with_audit(audit)))
}

/// Load `path` into a fresh interpreter
pub fn load_vm(path: &Path, config: &Config) -> Result<Vm> {
    let program = load_program(path)?;
    let vm = Vm::new(program, monitor(config)?)?.with_config(config.vm.clone());
    Ok(vm)
}
