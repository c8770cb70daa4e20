// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit hook that discards every record.

use sonde_core::{AuditHook, AuditRecord};

/// Audit hook that does nothing.
///
/// Used when no audit log is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpAuditHook;

impl NoOpAuditHook {
    pub fn new() -> Self {
        Self
    }
}

impl AuditHook for NoOpAuditHook {
    fn record(&self, _record: &AuditRecord) {}
}
