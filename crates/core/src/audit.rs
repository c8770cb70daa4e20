// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit records for state-changing monitoring calls

use crate::event::{EventKind, EventSet};
use crate::executable::MarkerId;
use serde::{Deserialize, Serialize};

/// Which legacy hook changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyHookKind {
    Trace,
    Profile,
    EvalOverride,
}

/// One successful state change, with enough detail to reconstruct it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditRecord {
    SetGlobalEvents {
        previous: EventSet,
        current: EventSet,
    },
    SetLocalEvents {
        unit: String,
        unit_id: u64,
        previous: EventSet,
        current: EventSet,
    },
    RegisterCallback {
        kind: EventKind,
        /// A callback was registered before this call
        replaced: bool,
        /// A callback is registered after this call
        installed: bool,
    },
    InsertMarker {
        unit: String,
        unit_id: u64,
        offset: usize,
        marker: MarkerId,
        previous: Option<MarkerId>,
    },
    RemoveMarker {
        unit: String,
        unit_id: u64,
        offset: usize,
        marker: MarkerId,
    },
    SetLegacyHook {
        hook: LegacyHookKind,
        installed: bool,
    },
}

impl AuditRecord {
    /// Audit event name (e.g., "monitor.set_global_events")
    pub fn name(&self) -> &'static str {
        match self {
            AuditRecord::SetGlobalEvents { .. } => "monitor.set_global_events",
            AuditRecord::SetLocalEvents { .. } => "monitor.set_local_events",
            AuditRecord::RegisterCallback { .. } => "monitor.register_callback",
            AuditRecord::InsertMarker { .. } => "monitor.insert_marker",
            AuditRecord::RemoveMarker { .. } => "monitor.remove_marker",
            AuditRecord::SetLegacyHook { .. } => "monitor.set_legacy_hook",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            AuditRecord::SetGlobalEvents { previous, current } => vec![
                ("previous", previous.to_string()),
                ("current", current.to_string()),
            ],
            AuditRecord::SetLocalEvents {
                unit,
                unit_id,
                previous,
                current,
            } => vec![
                ("unit", unit.clone()),
                ("unit_id", unit_id.to_string()),
                ("previous", previous.to_string()),
                ("current", current.to_string()),
            ],
            AuditRecord::RegisterCallback {
                kind,
                replaced,
                installed,
            } => vec![
                ("kind", kind.to_string()),
                ("replaced", replaced.to_string()),
                ("installed", installed.to_string()),
            ],
            AuditRecord::InsertMarker {
                unit,
                unit_id,
                offset,
                marker,
                previous,
            } => {
                let mut fields = vec![
                    ("unit", unit.clone()),
                    ("unit_id", unit_id.to_string()),
                    ("offset", offset.to_string()),
                    ("marker", marker.to_string()),
                ];
                if let Some(previous) = previous {
                    fields.push(("previous", previous.to_string()));
                }
                fields
            }
            AuditRecord::RemoveMarker {
                unit,
                unit_id,
                offset,
                marker,
            } => vec![
                ("unit", unit.clone()),
                ("unit_id", unit_id.to_string()),
                ("offset", offset.to_string()),
                ("marker", marker.to_string()),
            ],
            AuditRecord::SetLegacyHook { hook, installed } => vec![
                ("hook", format!("{:?}", hook).to_lowercase()),
                ("installed", installed.to_string()),
            ],
        }
    }
}

/// External auditor notified of every successful state change.
///
/// Called while the monitor's state lock is held, so records arrive in the
/// order the changes were applied. Implementations must not call back into
/// the monitor.
pub trait AuditHook: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
