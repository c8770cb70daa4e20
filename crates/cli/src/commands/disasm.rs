// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sonde disasm <file>` - List instructions and the traps armed on them

use crate::config::Config;
use crate::error::CliError;
use crate::instrument::MonitorArgs;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct DisasmArgs {
    /// Program file
    pub file: PathBuf,

    /// Only list this function
    #[arg(long)]
    pub function: Option<String>,

    #[command(flatten)]
    pub monitor: MonitorArgs,
}

pub fn disasm(args: DisasmArgs, config: &Config) -> Result<()> {
    let vm = super::load_vm(&args.file, config)?;
    let global = args.monitor.global_events(config.monitor.default_events()?)?;
    args.monitor.apply(&vm, global)?;

    let units: Vec<_> = match &args.function {
        Some(name) => {
            let unit = vm.unit(name).ok_or_else(|| {
                let names: Vec<&str> = vm.program().units().iter().map(|u| u.name()).collect();
                CliError::unknown_entry(name, &args.file.display().to_string(), &names)
            })?;
            vec![unit.clone()]
        }
        None => vm.program().units().to_vec(),
    };

    for (i, unit) in units.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("{}", sonde_asm::disassemble(unit));
    }
    Ok(())
}
