// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::legacy::{eval_override, profile_hook, trace_hook};
use std::sync::Mutex;
use yare::parameterized;

fn vm(source: &str) -> Vm {
    let program = sonde_asm::parse(source).unwrap();
    Vm::new(program, Arc::new(Monitor::new())).unwrap()
}

const ARITH: &str = "
fn add(a, b)
    load a; load b; add; return
end

fn sum_to(n)
    push 0; store total
top:
    load n; push 0; gt
    jump_if_false done
    load total; load n; add; store total
    load n; push 1; sub; store n
    jump top
done:
    load total; return
end

fn fact(n)
    load n; push 1; le
    jump_if_false recurse
    push 1; return
recurse:
    load n; load n; push 1; sub
    call fact 1
    mul; return
end

fn divide(a, b)
    load a; load b; div; return
end

fn describe(x)
    load x; native str 1; push \"!\"; add; return
end

fn forever(n)
    load n; call forever 1; return
end
";

#[parameterized(
    add = { "add", vec![Value::Int(2), Value::Int(3)], Value::Int(5) },
    loop_sum = { "sum_to", vec![Value::Int(10)], Value::Int(55) },
    recursion = { "fact", vec![Value::Int(5)], Value::Int(120) },
    native = { "describe", vec![Value::Int(7)], Value::str("7!") },
)]
fn runs_programs(function: &str, args: Vec<Value>, expected: Value) {
    assert_eq!(vm(ARITH).call(function, args).unwrap(), expected);
}

#[test]
fn runtime_errors_surface_as_uncaught_exceptions() {
    let err = vm(ARITH)
        .call("divide", vec![Value::Int(1), Value::Int(0)])
        .unwrap_err();
    assert!(err.exception().unwrap().is_kind("ZeroDivisionError"));
}

#[test]
fn host_call_errors() {
    let vm = vm(ARITH);
    assert_eq!(
        vm.call("missing", vec![]).unwrap_err(),
        VmError::UnknownFunction("missing".to_string())
    );
    assert!(matches!(
        vm.call("add", vec![Value::Int(1)]).unwrap_err(),
        VmError::Arity { expected: 2, got: 1, .. }
    ));
}

#[test]
fn depth_limit_raises_recursion_error() {
    let vm = vm(ARITH).with_config(VmConfig { max_depth: 16 });
    let err = vm.call("forever", vec![Value::Int(0)]).unwrap_err();
    assert!(err.exception().unwrap().is_kind("RecursionError"));
}

#[test]
fn unknown_native_is_name_error() {
    let vm = vm(ARITH).with_natives(Natives::new());
    let err = vm.call("describe", vec![Value::Int(1)]).unwrap_err();
    assert!(err.exception().unwrap().is_kind("NameError"));
}

const EXCEPTIONS: &str = "
fn safe_div(a, b)
    try failed
    load a; load b; div
    end_try
    return
failed:
    store e
    push -1; return
end

fn reraise()
    try failed
    push \"bad\"; exception ValueError; raise
failed:
    raise
end

fn outer()
    try failed
    call inner 0
    end_try
    return
failed:
    return
end

fn inner()
    push \"deep\"; exception KeyError; raise
end
";

#[test]
fn handlers_catch_exceptions() {
    let vm = vm(EXCEPTIONS);
    assert_eq!(
        vm.call("safe_div", vec![Value::Int(6), Value::Int(3)]).unwrap(),
        Value::Int(2)
    );
    assert_eq!(
        vm.call("safe_div", vec![Value::Int(6), Value::Int(0)]).unwrap(),
        Value::Int(-1)
    );
}

#[test]
fn exceptions_propagate_through_frames() {
    let vm = vm(EXCEPTIONS);
    let caught = vm.call("outer", vec![]).unwrap();
    assert_eq!(caught, Value::exception(Exception::new("KeyError", "deep")));

    let err = vm.call("reraise", vec![]).unwrap_err();
    assert_eq!(err.exception(), Some(&Exception::new("ValueError", "bad")));
}

const GENERATORS: &str = "
fn count(n)
    push 0; store i
top:
    load i; load n; lt
    jump_if_false done
    load i; yield; pop
    load i; push 1; add; store i
    jump top
done:
end

fn total(n)
    push 0; store sum
    load n; gen count 1
next:
    for_iter finished
    load sum; add; store sum
    jump next
finished:
    load sum; return
end

fn guarded()
    try stop
again:
    push none; yield; pop
    jump again
stop:
    pop
    push \"stopped\"; yield
    return
end

fn thrower()
    gen guarded 0
    dup; for_iter done
    pop
    push \"halt\"; exception StopIt
    throw
    return
done:
    return
end
";

#[test]
fn generators_yield_values_to_for_iter() {
    let vm = vm(GENERATORS);
    assert_eq!(vm.call("total", vec![Value::Int(5)]).unwrap(), Value::Int(10));
    assert_eq!(vm.call("total", vec![Value::Int(0)]).unwrap(), Value::Int(0));
}

#[test]
fn throw_resumes_generator_with_exception() {
    let vm = vm(GENERATORS);
    assert_eq!(vm.call("thrower", vec![]).unwrap(), Value::str("stopped"));
}

#[test]
fn yield_outside_generator_is_an_error() {
    let vm = vm("fn f()\n push 1; yield\nend\n");
    let err = vm.call("f", vec![]).unwrap_err();
    assert!(err.exception().unwrap().is_kind("RuntimeError"));
}

#[test]
fn trace_hook_sees_calls_lines_and_returns() {
    let vm = vm(ARITH);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    vm.monitor()
        .set_trace(Some(trace_hook(move |unit, _, event| {
            sink.lock().unwrap().push((unit.name().to_string(), event.clone()));
        })))
        .unwrap();

    vm.call("add", vec![Value::Int(1), Value::Int(2)]).unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            ("add".to_string(), TraceEvent::Call),
            ("add".to_string(), TraceEvent::Line(3)),
            ("add".to_string(), TraceEvent::Return),
        ]
    );
}

#[test]
fn profile_hook_sees_natives() {
    let vm = vm(ARITH);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    vm.monitor()
        .set_profile(Some(profile_hook(move |_, _, event| {
            sink.lock().unwrap().push(event.clone());
        })))
        .unwrap();

    vm.call("describe", vec![Value::Int(1)]).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ProfileEvent::Call,
            ProfileEvent::NativeCall(Arc::from("str")),
            ProfileEvent::NativeReturn(Arc::from("str")),
            ProfileEvent::Return,
        ]
    );
}

#[test]
fn eval_override_replaces_calls() {
    let vm = vm(ARITH);
    vm.monitor()
        .set_eval_override(Some(eval_override(|unit, _| {
            (unit.name() == "fact").then(|| Ok(Value::Int(-1)))
        })))
        .unwrap();

    assert_eq!(vm.call("fact", vec![Value::Int(5)]).unwrap(), Value::Int(-1));
    assert_eq!(
        vm.call("add", vec![Value::Int(1), Value::Int(1)]).unwrap(),
        Value::Int(2)
    );
}
