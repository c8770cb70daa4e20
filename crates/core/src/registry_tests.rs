// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn table_is_indexed_by_kind() {
    assert_eq!(all().len(), EventKind::COUNT);
    for kind in EventKind::ALL {
        assert_eq!(lookup(kind).kind, kind);
    }
}

#[test]
fn instrumented_flag_matches_kind() {
    for spec in all() {
        assert_eq!(spec.instrumented, spec.kind.requires_instrumentation());
    }
    assert!(!lookup(EventKind::Raise).instrumented);
    assert!(!lookup(EventKind::Marker).instrumented);
}

#[parameterized(
    call = { EventKind::Call, ArgShape::Offset },
    unwind = { EventKind::Unwind, ArgShape::Offset },
    native_call = { EventKind::NativeCall, ArgShape::Native },
    native_return = { EventKind::NativeReturn, ArgShape::Native },
    raise = { EventKind::Raise, ArgShape::Exception },
    handled = { EventKind::ExceptionHandled, ArgShape::Exception },
    line = { EventKind::Line, ArgShape::Line },
    jump = { EventKind::Jump, ArgShape::Jump },
    branch = { EventKind::Branch, ArgShape::Jump },
    instruction = { EventKind::Instruction, ArgShape::Offset },
    marker = { EventKind::Marker, ArgShape::Marker },
)]
fn argument_shapes(kind: EventKind, shape: ArgShape) {
    assert_eq!(lookup(kind).shape, shape);
}
