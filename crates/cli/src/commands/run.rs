// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sonde run <file>` - Execute a program, reporting monitored events

use crate::config::Config;
use crate::error::CliError;
use crate::instrument::MonitorArgs;
use crate::output::{self, EventLine, OutputFormat, RunResult};
use anyhow::Result;
use clap::Args;
use sonde_core::MonitorError;
use sonde_engine::legacy::{trace_hook, TraceEvent};
use sonde_engine::{callback, Natives, Value, Vm, VmError};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Program file
    pub file: PathBuf,

    /// Function to call
    #[arg(long, default_value = "main")]
    pub entry: String,

    /// Argument for the entry function (int, true/false, none, or string)
    #[arg(long = "arg", value_name = "VALUE", value_parser = parse_value)]
    pub args: Vec<Value>,

    #[command(flatten)]
    pub monitor: MonitorArgs,

    /// Install a legacy trace hook instead of event monitoring
    #[arg(long)]
    pub trace: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

pub fn parse_value(s: &str) -> Result<Value, String> {
    Ok(match s {
        "none" => Value::None,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match s.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::str(s),
        },
    })
}

/// Builtins plus `print`, which writes its arguments to stdout
fn natives() -> Natives {
    let mut natives = Natives::builtins();
    natives.register("print", |args| {
        let text: Vec<String> = args.iter().map(Value::to_string).collect();
        println!("{}", text.join(" "));
        Ok(Value::None)
    });
    natives
}

fn trace_line(event: &TraceEvent) -> String {
    match event {
        TraceEvent::Call => "call".to_string(),
        TraceEvent::Line(line) => format!("line {}", line),
        TraceEvent::Return => "return".to_string(),
        TraceEvent::Exception(e) => format!("exception {}", e),
    }
}

fn conflict(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<MonitorError>() {
        Some(e) if e.is_conflict() => CliError::conflict(e).into(),
        _ => err,
    }
}

fn install(vm: &Vm, args: &RunArgs, config: &Config) -> Result<()> {
    let global = args.monitor.global_events(config.monitor.default_events()?)?;
    args.monitor.apply(vm, global)?;

    let format = args.format;
    for kind in args.monitor.watched(global).iter() {
        vm.monitor().register_callback(
            kind,
            Some(callback(move |event| {
                output::print(&EventLine::from(event), format);
                Ok(())
            })),
        );
    }

    if args.trace {
        vm.monitor().set_trace(Some(trace_hook(|unit, offset, event| {
            println!("trace {} {} @{}", trace_line(event), unit.name(), offset);
        })))?;
    }
    Ok(())
}

pub fn run(args: RunArgs, config: &Config) -> Result<()> {
    let vm = super::load_vm(&args.file, config)?.with_natives(natives());

    if vm.unit(&args.entry).is_none() {
        let names: Vec<&str> = vm.program().units().iter().map(|u| u.name()).collect();
        return Err(
            CliError::unknown_entry(&args.entry, &args.file.display().to_string(), &names).into(),
        );
    }

    install(&vm, &args, config).map_err(conflict)?;

    let span = tracing::info_span!("run", entry = %args.entry);
    let _guard = span.enter();
    match vm.call(&args.entry, args.args.clone()) {
        Ok(value) => {
            output::print(
                &RunResult {
                    result: value.to_string(),
                },
                args.format,
            );
            Ok(())
        }
        Err(VmError::Uncaught(e)) => {
            tracing::info!(exception = %e, "program raised");
            Err(anyhow::anyhow!("uncaught exception: {}", e))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
