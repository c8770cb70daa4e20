// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn records_serialize_with_type_tag() {
    let record = AuditRecord::SetGlobalEvents {
        previous: EventSet::EMPTY,
        current: EventKind::Line | EventKind::Call,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "set_global_events");
    assert_eq!(json["current"], serde_json::json!(["call", "line"]));

    let back: AuditRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn names_are_namespaced() {
    let record = AuditRecord::RegisterCallback {
        kind: EventKind::Jump,
        replaced: false,
        installed: true,
    };
    assert_eq!(record.name(), "monitor.register_callback");
}

#[test]
fn fields_describe_the_change() {
    let record = AuditRecord::InsertMarker {
        unit: "fib".to_string(),
        unit_id: 3,
        offset: 4,
        marker: MarkerId(9),
        previous: Some(MarkerId(2)),
    };
    let fields = record.fields();
    assert!(fields.contains(&("unit", "fib".to_string())));
    assert!(fields.contains(&("marker", "9".to_string())));
    assert!(fields.contains(&("previous", "2".to_string())));
}

#[test]
fn legacy_hook_field_is_lowercase() {
    let record = AuditRecord::SetLegacyHook {
        hook: LegacyHookKind::Trace,
        installed: true,
    };
    assert!(record.fields().contains(&("hook", "trace".to_string())));
}
