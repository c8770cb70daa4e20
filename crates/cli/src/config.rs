// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file loading
//!
//! Lookup order: `--config`, then `$SONDE_CONFIG`, then
//! `<config_dir>/sonde/config.toml`. Only the last may be absent.

use anyhow::{Context, Result};
use serde::Deserialize;
use sonde_core::EventSet;
use sonde_engine::VmConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SONDE_CONFIG";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vm: VmConfig,
    pub monitor: MonitorConfig,
    pub log: LogConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Global events enabled when `--events` is not given
    pub events: Option<String>,
}

impl MonitorConfig {
    pub fn default_events(&self) -> Result<EventSet> {
        match &self.events {
            Some(events) => events
                .parse()
                .with_context(|| format!("invalid [monitor] events: {}", events)),
            None => Ok(EventSet::EMPTY),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// JSON-lines file receiving every monitor state change
    pub log: Option<PathBuf>,
}

impl Config {
    /// Load from the first configured location
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Self::from_file(Path::new(&path));
        }
        match default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.monitor.default_events()?;
        Ok(config)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sonde").join("config.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
