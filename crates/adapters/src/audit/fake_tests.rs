// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sonde_core::{EventKind, EventSet};

#[test]
fn records_in_arrival_order() {
    let fake = FakeAuditHook::new();
    fake.record(&AuditRecord::SetGlobalEvents {
        previous: EventSet::EMPTY,
        current: EventKind::Line.into(),
    });
    fake.record(&AuditRecord::RegisterCallback {
        kind: EventKind::Line,
        replaced: false,
        installed: true,
    });

    assert_eq!(
        fake.names(),
        vec!["monitor.set_global_events", "monitor.register_callback"]
    );
}

#[test]
fn clones_share_records() {
    let fake = FakeAuditHook::new();
    let other = fake.clone();
    other.record(&AuditRecord::SetGlobalEvents {
        previous: EventSet::EMPTY,
        current: EventSet::EMPTY,
    });
    assert_eq!(fake.records().len(), 1);

    fake.clear();
    assert!(other.records().is_empty());
}
