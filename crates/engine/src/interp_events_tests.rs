// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event delivery through the interpreter

use super::*;
use crate::monitor::callback;
use sonde_core::{CallbackError, EventSet, MarkerId};
use std::cell::Cell;
use std::sync::Mutex;

type Log = Arc<Mutex<Vec<(EventKind, String, EventArgs)>>>;

const SOURCE: &str = r#"
fn three()
    push 1; store a
    push 2; store b
    load a; load b; add; return
end

fn down(n)
    load n; push 0; eq
    jump_if_false more
    push 0; return
more:
    load n; push 1; sub
    call down 1
    return
end

fn pick(x)
    load x
    jump_if_true yes
    push "no"; return
yes:
    push "yes"; jump out
out:
    return
end

fn describe(x)
    load x; native str 1; return
end

fn pair()
    push 1; yield; pop
    push 2; yield; pop
end

fn drive()
    gen pair 0
again:
    for_iter done
    pop
    jump again
done:
end

fn fails()
    push "x"; exception ValueError; raise
end

fn catches()
    try handler
    call fails 0
    end_try
handler:
    return
end

fn guarded_three()
    try caught
    call three 0
    end_try
    return
caught:
    return
end

fn waiter()
    try stop
    push none; yield
stop:
    return
end

fn interrupt()
    gen waiter 0
    for_iter done
    pop
    push "now"; exception Interrupt
    throw
done:
    return
end
"#;

fn vm() -> Vm {
    Vm::new(sonde_asm::parse(SOURCE).unwrap(), Arc::new(Monitor::new())).unwrap()
}

fn record(monitor: &Monitor, kinds: EventSet) -> Log {
    let log: Log = Arc::default();
    for kind in kinds.iter() {
        let sink = Arc::clone(&log);
        monitor.register_callback(
            kind,
            Some(callback(move |e| {
                sink.lock()
                    .unwrap()
                    .push((e.kind, e.function().to_string(), e.args.clone()));
                Ok(())
            })),
        );
    }
    log
}

fn kinds(log: &Log) -> Vec<EventKind> {
    log.lock().unwrap().iter().map(|(k, _, _)| *k).collect()
}

fn unit<'a>(vm: &'a Vm, name: &str) -> &'a Arc<CodeUnit> {
    vm.unit(name).unwrap()
}

#[test]
fn nothing_fires_while_idle() {
    let vm = vm();
    let log = record(vm.monitor(), EventSet::ALL);

    vm.call("down", vec![Value::Int(3)]).unwrap();
    vm.call("catches", vec![]).unwrap();
    vm.call("drive", vec![]).unwrap();

    assert!(log.lock().unwrap().is_empty());
    assert!(vm.program().units().iter().all(|u| u.executable().is_idle()));
}

#[test]
fn each_line_fires_once() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Line.into());
    vm.monitor().set_global_events(EventKind::Line.into()).unwrap();

    vm.call("three", vec![]).unwrap();
    let lines: Vec<_> = log.lock().unwrap().iter().map(|(_, _, a)| a.clone()).collect();
    assert_eq!(
        lines,
        vec![
            EventArgs::Line { line: 3 },
            EventArgs::Line { line: 4 },
            EventArgs::Line { line: 5 },
        ]
    );
}

#[test]
fn recursion_reports_every_call_site() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Call.into());
    vm.monitor().set_global_events(EventKind::Call.into()).unwrap();

    assert_eq!(vm.call("down", vec![Value::Int(5)]).unwrap(), Value::Int(0));
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 5);
    assert!(log
        .iter()
        .all(|(_, f, a)| f == "down" && *a == EventArgs::Offset { offset: 9 }));
}

#[test]
fn start_fires_once_per_frame() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Start.into());
    vm.monitor().set_global_events(EventKind::Start.into()).unwrap();

    vm.call("down", vec![Value::Int(2)]).unwrap();
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[test]
fn local_events_add_to_global() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Call | EventKind::Line);
    vm.monitor().set_global_events(EventKind::Call.into()).unwrap();
    vm.monitor()
        .set_local_events(unit(&vm, "three"), EventKind::Line.into())
        .unwrap();

    vm.call("guarded_three", vec![]).unwrap();
    let seen: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .map(|(k, f, _)| (*k, f.clone()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (EventKind::Call, "guarded_three".to_string()),
            (EventKind::Line, "three".to_string()),
            (EventKind::Line, "three".to_string()),
            (EventKind::Line, "three".to_string()),
        ]
    );
}

#[test]
fn branch_and_jump_report_destinations() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Branch | EventKind::Jump);
    vm.monitor()
        .set_global_events(EventKind::Branch | EventKind::Jump)
        .unwrap();

    assert_eq!(vm.call("pick", vec![Value::Bool(true)]).unwrap(), Value::str("yes"));
    assert_eq!(vm.call("pick", vec![Value::Bool(false)]).unwrap(), Value::str("no"));

    let args: Vec<_> = log.lock().unwrap().iter().map(|(_, _, a)| a.clone()).collect();
    assert_eq!(
        args,
        vec![
            EventArgs::Jump { offset: 1, destination: 4 },
            EventArgs::Jump { offset: 5, destination: 6 },
            EventArgs::Jump { offset: 1, destination: 2 },
        ]
    );
}

#[test]
fn native_calls_bracket_the_call() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::NativeCall | EventKind::NativeReturn);
    vm.monitor()
        .set_global_events(EventKind::NativeCall | EventKind::NativeReturn)
        .unwrap();

    vm.call("describe", vec![Value::Int(4)]).unwrap();
    let native = EventArgs::Native {
        offset: 1,
        callable: Arc::from("str"),
    };
    let log = log.lock().unwrap();
    assert_eq!(log[0], (EventKind::NativeCall, "describe".to_string(), native.clone()));
    assert_eq!(log[1], (EventKind::NativeReturn, "describe".to_string(), native));
}

#[test]
fn generator_lifecycle() {
    let vm = vm();
    let events = EventKind::Start | EventKind::Resume | EventKind::Yield | EventKind::Return;
    let log = record(vm.monitor(), events);
    vm.monitor().set_local_events(unit(&vm, "pair"), events).unwrap();

    vm.call("drive", vec![]).unwrap();
    let seen: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .map(|(k, _, a)| (*k, a.offset()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (EventKind::Start, Some(0)),
            (EventKind::Yield, Some(1)),
            (EventKind::Resume, Some(2)),
            (EventKind::Yield, Some(4)),
            (EventKind::Resume, Some(5)),
            (EventKind::Return, Some(7)),
        ]
    );
}

#[test]
fn exception_events_follow_propagation() {
    let vm = vm();
    let events = EventKind::Raise | EventKind::Unwind | EventKind::ExceptionHandled;
    let log = record(vm.monitor(), events);
    vm.monitor().set_global_events(events).unwrap();
    assert!(unit(&vm, "fails").executable().trapped_offsets().next().is_none());

    vm.call("catches", vec![]).unwrap();
    let exception = Exception::new("ValueError", "x");
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            (
                EventKind::Raise,
                "fails".to_string(),
                EventArgs::Exception { offset: 2, exception: exception.clone() }
            ),
            (EventKind::Unwind, "fails".to_string(), EventArgs::Offset { offset: 2 }),
            (
                EventKind::ExceptionHandled,
                "catches".to_string(),
                EventArgs::Exception { offset: 3, exception }
            ),
        ]
    );
}

#[test]
fn throw_into_generator_is_reported() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Throw | EventKind::ExceptionHandled);
    vm.monitor()
        .set_local_events(unit(&vm, "waiter"), EventKind::Throw | EventKind::ExceptionHandled)
        .unwrap();

    // The generator returns instead of yielding again
    assert_eq!(vm.call("interrupt", vec![]).unwrap(), Value::None);
    assert_eq!(kinds(&log), vec![EventKind::Throw, EventKind::ExceptionHandled]);
}

#[test]
fn markers_fire_with_their_id() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Marker.into());
    let three = unit(&vm, "three");
    vm.monitor().insert_marker(three, 2, 42).unwrap();

    vm.call("three", vec![]).unwrap();
    assert_eq!(
        log.lock().unwrap()[0].2,
        EventArgs::Marker { offset: 2, marker: MarkerId(42) }
    );

    vm.monitor().remove_marker(three, 2).unwrap();
    vm.call("three", vec![]).unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn events_at_one_offset_fire_in_fixed_order() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Line | EventKind::Marker);
    vm.monitor().set_global_events(EventKind::Line.into()).unwrap();
    vm.monitor().insert_marker(unit(&vm, "three"), 2, 9).unwrap();

    vm.call("three", vec![]).unwrap();
    assert_eq!(
        kinds(&log),
        vec![EventKind::Line, EventKind::Line, EventKind::Marker, EventKind::Line]
    );
    assert_eq!(log.lock().unwrap()[1].2, EventArgs::Line { line: 4 });
}

#[test]
fn marker_armed_by_a_callback_fires_in_the_same_call() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Marker.into());
    let three = Arc::clone(unit(&vm, "three"));
    let monitor = Arc::downgrade(vm.monitor());
    let target = Arc::clone(&three);
    vm.monitor().register_callback(
        EventKind::Start,
        Some(callback(move |_| {
            if let Some(monitor) = monitor.upgrade() {
                monitor.insert_marker(&target, 6, 7).unwrap();
            }
            Ok(())
        })),
    );
    vm.monitor().set_local_events(&three, EventKind::Start.into()).unwrap();

    assert_eq!(vm.call("three", vec![]).unwrap(), Value::Int(3));
    assert_eq!(
        *log.lock().unwrap(),
        vec![(
            EventKind::Marker,
            "three".to_string(),
            EventArgs::Marker { offset: 6, marker: MarkerId(7) }
        )]
    );
}

#[test]
fn caller_sees_changes_made_during_a_callee() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Marker.into());
    let caller = Arc::clone(unit(&vm, "guarded_three"));
    let monitor = Arc::downgrade(vm.monitor());
    vm.monitor().register_callback(
        EventKind::Start,
        Some(callback(move |_| {
            if let Some(monitor) = monitor.upgrade() {
                monitor.insert_marker(&caller, 3, 1).unwrap();
            }
            Ok(())
        })),
    );
    vm.monitor()
        .set_local_events(unit(&vm, "three"), EventKind::Start.into())
        .unwrap();

    vm.call("guarded_three", vec![]).unwrap();
    assert_eq!(kinds(&log), vec![EventKind::Marker]);
    assert_eq!(log.lock().unwrap()[0].1, "guarded_three");
}

#[test]
fn frozen_unit_still_reports_raise() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Raise.into());
    unit(&vm, "fails").freeze();
    vm.monitor().set_global_events(EventKind::Raise.into()).unwrap();

    vm.call("catches", vec![]).unwrap();
    assert_eq!(kinds(&log), vec![EventKind::Raise]);
    assert_eq!(log.lock().unwrap()[0].1, "fails");
}

#[test]
fn instruction_events_cover_every_step() {
    let vm = vm();
    let log = record(vm.monitor(), EventKind::Instruction.into());
    vm.monitor()
        .set_local_events(unit(&vm, "three"), EventKind::Instruction.into())
        .unwrap();

    vm.call("three", vec![]).unwrap();
    let offsets: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|(_, _, a)| a.offset())
        .collect();
    assert_eq!(offsets, (0..8).collect::<Vec<_>>());
}

#[test]
fn only_the_latest_callback_runs() {
    let vm = vm();
    vm.monitor().set_global_events(EventKind::Start.into()).unwrap();
    let first = record(vm.monitor(), EventKind::Start.into());
    let second = record(vm.monitor(), EventKind::Start.into());

    vm.call("three", vec![]).unwrap();
    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[test]
fn failing_callback_raises_at_the_trap() {
    let vm = vm();
    vm.monitor().register_callback(
        EventKind::Line,
        Some(callback(|_| Err(CallbackError::new("tool bug")))),
    );
    vm.monitor()
        .set_local_events(unit(&vm, "three"), EventKind::Line.into())
        .unwrap();

    let err = vm.call("three", vec![]).unwrap_err();
    let fault = err.exception().unwrap();
    assert!(fault.is_kind(Exception::CALLBACK_FAULT));
    assert!(fault.message.contains("tool bug"));

    let caught = vm.call("guarded_three", vec![]).unwrap();
    assert!(matches!(caught, Value::Exception(e) if e.is_kind(Exception::CALLBACK_FAULT)));
}

#[test]
fn callbacks_see_the_stack() {
    let vm = vm();
    let depths = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&depths);
    vm.monitor().register_callback(
        EventKind::Call,
        Some(callback(move |e| {
            let top = e.stack.top().unwrap();
            assert_eq!(top.function(), "down");
            assert_eq!(top.offset(), 9);
            let n = top.locals()[0].as_int().unwrap();
            sink.lock().unwrap().push((e.stack.depth(), n));
            Ok(())
        })),
    );
    vm.monitor().set_global_events(EventKind::Call.into()).unwrap();

    vm.call("down", vec![Value::Int(2)]).unwrap();
    assert_eq!(*depths.lock().unwrap(), vec![(1, 2), (2, 1)]);
}

#[test]
fn callbacks_do_not_trigger_nested_events() {
    let vm = Arc::new(vm());
    let log = record(vm.monitor(), EventKind::Line.into());
    let inner = Arc::downgrade(&vm);
    vm.monitor().register_callback(
        EventKind::Start,
        Some(callback(move |_| {
            if let Some(vm) = inner.upgrade() {
                vm.call("three", vec![]).unwrap();
            }
            Ok(())
        })),
    );
    vm.monitor()
        .set_global_events(EventKind::Start | EventKind::Line)
        .unwrap();

    vm.call("describe", vec![Value::Int(1)]).unwrap();
    let functions: Vec<_> = log.lock().unwrap().iter().map(|(_, f, _)| f.clone()).collect();
    assert_eq!(functions, vec!["describe".to_string()]);
}

thread_local! {
    static LINES: Cell<usize> = const { Cell::new(0) };
}

#[test]
fn activation_changes_apply_to_whole_calls() {
    let vm = vm();
    vm.monitor().register_callback(
        EventKind::Line,
        Some(callback(|_| {
            LINES.with(|c| c.set(c.get() + 1));
            Ok(())
        })),
    );

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    LINES.with(|c| c.set(0));
                    vm.call("three", vec![]).unwrap();
                    let seen = LINES.with(Cell::get);
                    assert!(seen == 0 || seen == 3, "saw {} line events", seen);
                }
            });
        }
        s.spawn(|| {
            for i in 0..200 {
                let events = if i % 2 == 0 {
                    EventKind::Line.into()
                } else {
                    EventSet::EMPTY
                };
                vm.monitor().set_global_events(events).unwrap();
            }
        });
    });
}

#[test]
fn dropping_the_vm_releases_its_units() {
    let monitor = Arc::new(Monitor::new());
    let vm = Vm::new(sonde_asm::parse(SOURCE).unwrap(), Arc::clone(&monitor)).unwrap();
    vm.monitor()
        .set_local_events(unit(&vm, "three"), EventKind::Line.into())
        .unwrap();
    assert!(monitor.unit_count() > 0);

    drop(vm);
    assert_eq!(monitor.unit_count(), 0);
    assert_eq!(monitor.mode(), sonde_core::Mode::Idle);
}
