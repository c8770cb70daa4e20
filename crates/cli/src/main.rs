// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sonde - run and inspect programs under event monitoring

mod commands;
mod config;
mod error;
mod instrument;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, disasm, events, run};
use config::Config;
use error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;

/// Environment variable holding a tracing filter; overrides `[log] filter`
const LOG_ENV: &str = "SONDE_LOG";

#[derive(Parser)]
#[command(
    name = "sonde",
    version,
    about = "sonde - event monitoring for a small bytecode VM"
)]
struct Cli {
    /// Configuration file (default: $SONDE_CONFIG or <config dir>/sonde/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a function, printing monitored events
    Run(run::RunArgs),
    /// List instructions and armed traps
    Disasm(disasm::DisasmArgs),
    /// Assemble a program and summarize its functions
    Check(check::CheckArgs),
    /// List every event kind
    Events(events::EventsArgs),
}

fn setup_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log.filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    setup_logging(&config);

    match cli.command {
        Commands::Run(args) => run::run(args, &config),
        Commands::Disasm(args) => disasm::disasm(args, &config),
        Commands::Check(args) => check::check(args),
        Commands::Events(args) => {
            events::events(args);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(friendly) => eprint!("{}", friendly),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
