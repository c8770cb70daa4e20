// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;
use sonde_core::EventKind;
use sonde_engine::{EventArgs, MonitorEvent};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(value) {
                println!("{}", json);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + fmt::Display>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(items) {
                println!("{}", json);
            }
        }
    }
}

/// One monitored event as reported by `sonde run`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventLine {
    pub kind: EventKind,
    pub function: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<u8>,
    #[serde(skip)]
    args: String,
}

impl From<&MonitorEvent<'_>> for EventLine {
    fn from(event: &MonitorEvent<'_>) -> Self {
        let mut line = EventLine {
            kind: event.kind,
            function: event.function().to_string(),
            depth: event.stack.depth(),
            offset: event.args.offset(),
            line: None,
            destination: None,
            callable: None,
            exception: None,
            marker: None,
            args: event.args.to_string(),
        };
        match &event.args {
            EventArgs::Line { line: number } => line.line = Some(*number),
            EventArgs::Jump { destination, .. } => line.destination = Some(*destination),
            EventArgs::Native { callable, .. } => line.callable = Some(callable.to_string()),
            EventArgs::Exception { exception, .. } => {
                line.exception = Some(exception.to_string())
            }
            EventArgs::Marker { marker, .. } => line.marker = Some(marker.0),
            EventArgs::Offset { .. } => {}
        }
        line
    }
}

impl fmt::Display for EventLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.depth.saturating_sub(1) * 2;
        write!(
            f,
            "{:indent$}{} {} {}",
            "",
            self.kind,
            self.function,
            self.args,
            indent = indent
        )
    }
}

/// Final value of `sonde run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub result: String,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=> {}", self.result)
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
