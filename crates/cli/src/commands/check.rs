// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sonde check <file>` - Assemble a program and summarize its functions

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sonde_core::Program;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Program file
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct FunctionSummary {
    pub name: String,
    pub arity: u8,
    pub locals: u16,
    pub instructions: usize,
    pub lines: usize,
}

impl fmt::Display for FunctionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} arity={} locals={} instructions={} lines={}",
            self.name, self.arity, self.locals, self.instructions, self.lines
        )
    }
}

pub fn summarize(program: &Program) -> Vec<FunctionSummary> {
    program
        .units()
        .iter()
        .map(|unit| FunctionSummary {
            name: unit.name().to_string(),
            arity: unit.arity(),
            locals: unit.locals(),
            instructions: unit.len(),
            lines: (0..unit.len()).filter(|&i| unit.starts_line(i)).count(),
        })
        .collect()
}

pub fn check(args: CheckArgs) -> Result<()> {
    let program = super::load_program(&args.file)?;
    let summary = summarize(&program);
    output::print_list(&summary, args.format);
    if args.format == OutputFormat::Text {
        println!("ok: {} functions", summary.len());
    }
    Ok(())
}
