// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parse;
use similar_asserts::assert_eq;
use sonde_core::{EventKind, Executable, MarkerId, Trap};
use std::sync::Arc;

const SOURCE: &str = "\
fn double(x)
    load x; push 2
    mul
    return
end
";

#[test]
fn plain_listing() {
    let program = parse(SOURCE).unwrap();
    let unit = program.get("double").unwrap();
    assert_eq!(
        disassemble(unit),
        "\
fn double arity=1 locals=1 version=0
    2     0  load 0
          1  push 2
    3     2  mul
    4     3  return
"
    );
}

#[test]
fn traps_are_annotated() {
    let program = parse(SOURCE).unwrap();
    let unit = program.get("double").unwrap();
    let line = Trap {
        events: EventKind::Line.into(),
        marker: None,
    };
    let marked = Trap {
        events: EventKind::Line | EventKind::Return,
        marker: Some(MarkerId(7)),
    };
    unit.install(Arc::new(Executable::new(
        2,
        EventKind::Line | EventKind::Return,
        vec![Some(line), None, Some(line), Some(marked)],
    )));

    let listing = disassemble(unit);
    assert!(listing.starts_with("fn double arity=1 locals=1 version=2\n"));
    assert!(listing.contains("    2     0  load 0  ; line\n"));
    assert!(listing.contains("          1  push 2\n"));
    assert!(listing.contains("    4     3  return  ; return|line marker=7\n"));
}
