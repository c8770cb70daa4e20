// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sonde events` - List the event registry

use crate::output::{self, OutputFormat};
use clap::Args;
use serde::Serialize;
use sonde_core::registry::{self, EventSpec};
use std::fmt;

#[derive(Args)]
pub struct EventsArgs {
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
#[serde(transparent)]
struct Row(&'static EventSpec);

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = self.0;
        write!(
            f,
            "{:<18} {:<5} {:<28} {}",
            spec.kind.name(),
            if spec.instrumented { "trap" } else { "check" },
            format!("({})", spec.shape),
            spec.summary
        )
    }
}

pub fn events(args: EventsArgs) {
    let rows: Vec<Row> = registry::all().iter().map(Row).collect();
    if args.format == OutputFormat::Text {
        println!("{:<18} {:<5} {:<28} SUMMARY", "KIND", "SITE", "ARGS");
    }
    output::print_list(&rows, args.format);
}
