// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake audit hook for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use sonde_core::{AuditHook, AuditRecord};
use std::sync::{Arc, Mutex};

/// Audit hook that remembers every record it receives
#[derive(Clone, Default)]
pub struct FakeAuditHook {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl FakeAuditHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded audit records, oldest first
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Audit event names, oldest first
    pub fn names(&self) -> Vec<&'static str> {
        self.records().iter().map(AuditRecord::name).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl AuditHook for FakeAuditHook {
    fn record(&self, record: &AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
