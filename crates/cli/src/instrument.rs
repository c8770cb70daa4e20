// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring flags shared by `run` and `disasm`

use anyhow::{anyhow, Context, Result};
use clap::Args;
use sonde_core::{EventKind, EventSet};
use sonde_engine::Vm;

#[derive(Args, Debug, Default)]
pub struct MonitorArgs {
    /// Global events, comma separated (e.g., "call,line"); overrides the config
    #[arg(long, value_name = "KINDS")]
    pub events: Option<String>,

    /// Local events for one function (FUNCTION=KINDS)
    #[arg(long = "local", value_name = "FUNCTION=KINDS", value_parser = parse_local)]
    pub local: Vec<LocalEvents>,

    /// Marker at an instruction (FUNCTION:OFFSET[:ID]); the id defaults to 0
    #[arg(long = "marker", value_name = "FUNCTION:OFFSET[:ID]", value_parser = parse_marker)]
    pub markers: Vec<MarkerSpec>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalEvents {
    pub function: String,
    pub events: EventSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSpec {
    pub function: String,
    pub offset: usize,
    pub id: u32,
}

pub fn parse_local(s: &str) -> Result<LocalEvents, String> {
    let (function, kinds) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid FUNCTION=KINDS: no `=` found in `{s}`"))?;
    let events = kinds.parse::<EventSet>().map_err(|e| e.to_string())?;
    Ok(LocalEvents {
        function: function.trim().to_string(),
        events,
    })
}

pub fn parse_marker(s: &str) -> Result<MarkerSpec, String> {
    let mut parts = s.split(':');
    let function = parts.next().unwrap_or_default().trim();
    if function.is_empty() {
        return Err(format!("invalid marker `{s}`: missing function"));
    }
    let offset = parts
        .next()
        .ok_or_else(|| format!("invalid marker `{s}`: missing offset"))?
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid marker offset in `{s}`: {e}"))?;
    let id = match parts.next() {
        Some(id) => id
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid marker id in `{s}`: {e}"))?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(format!("invalid marker `{s}`: too many fields"));
    }
    Ok(MarkerSpec {
        function: function.to_string(),
        offset,
        id,
    })
}

impl MonitorArgs {
    /// Global events requested on the command line, or `fallback`
    pub fn global_events(&self, fallback: EventSet) -> Result<EventSet> {
        match &self.events {
            Some(events) => events
                .parse()
                .with_context(|| format!("invalid --events: {}", events)),
            None => Ok(fallback),
        }
    }

    /// Every kind a callback should be registered for
    pub fn watched(&self, global: EventSet) -> EventSet {
        let mut watched = global;
        for local in &self.local {
            watched = watched | local.events;
        }
        if !self.markers.is_empty() {
            watched |= EventKind::Marker;
        }
        watched
    }

    /// Configure `vm`'s monitor with the requested events and markers
    pub fn apply(&self, vm: &Vm, global: EventSet) -> Result<()> {
        let monitor = vm.monitor();
        monitor.set_global_events(global)?;
        for local in &self.local {
            let unit = vm
                .unit(&local.function)
                .ok_or_else(|| anyhow!("--local: unknown function: {}", local.function))?;
            monitor.set_local_events(unit, local.events)?;
        }
        for marker in &self.markers {
            let unit = vm
                .unit(&marker.function)
                .ok_or_else(|| anyhow!("--marker: unknown function: {}", marker.function))?;
            monitor.insert_marker(unit, marker.offset, marker.id)?;
        }
        tracing::debug!(
            global = %global,
            locals = self.local.len(),
            markers = self.markers.len(),
            "monitoring configured"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "instrument_tests.rs"]
mod tests;
