// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for configuration and the audit log

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::{TestEnv, FIB, SMALL};
use predicates::prelude::*;

#[test]
fn config_supplies_default_events() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    let config = env.write("sonde.toml", "[monitor]\nevents = \"line\"\n");
    env.sonde()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("line main line=2"));
}

#[test]
fn command_line_events_override_config() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    let config = env.write("sonde.toml", "[monitor]\nevents = \"line\"\n");
    env.sonde()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&file)
        .args(["--events", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("line main").not());
}

#[test]
fn config_from_environment() {
    let env = TestEnv::new();
    let file = env.write("fib.sasm", FIB);
    let config = env.write("env.toml", "[vm]\nmax_depth = 4\n");
    env.sonde()
        .env("SONDE_CONFIG", &config)
        .arg("run")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("RecursionError"));
}

// dirs::config_dir() only honors XDG_CONFIG_HOME on Linux
#[cfg(target_os = "linux")]
#[test]
fn default_config_location_is_used() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    let dir = env.dir.path().join("config").join("sonde");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[monitor]\nevents = \"return\"\n").unwrap();

    env.sonde()
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("return main offset=5"));
}

#[test]
fn invalid_config_fails() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    let config = env.write("sonde.toml", "[monitor]\nevents = \"sometimes\"\n");
    env.sonde()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn audit_log_records_state_changes() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    let audit = env.dir.path().join("logs").join("audit.jsonl");
    let config = env.write(
        "sonde.toml",
        &format!("[audit]\nlog = {:?}\n", audit.display().to_string()),
    );
    env.sonde()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&file)
        .args(["--events", "line", "--marker", "main:0:1"])
        .assert()
        .success();

    let text = std::fs::read_to_string(&audit).unwrap();
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let types: Vec<&str> = records.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec![
            "set_global_events",
            "insert_marker",
            "register_callback",
            "register_callback"
        ]
    );
    assert_eq!(records[0]["seq"], 1);
    assert_eq!(records[0]["current"], serde_json::json!(["line"]));
    assert_eq!(records[1]["marker"], 1);
}

#[test]
fn log_filter_from_environment_writes_stderr() {
    let env = TestEnv::new();
    let file = env.write("small.sasm", SMALL);
    env.sonde()
        .env("SONDE_LOG", "debug")
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("=> 3"))
        .stderr(predicate::str::contains("program loaded"));
}
