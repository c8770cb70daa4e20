// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn guard_in(mode: Mode) -> CompatGuard {
    match mode {
        Mode::Idle => CompatGuard::new(),
        Mode::LegacyTrace => CompatGuard::new()
            .transition(GuardInput::EngageLegacy)
            .unwrap(),
        Mode::EventMonitoring => CompatGuard::new()
            .transition(GuardInput::EngageMonitoring)
            .unwrap(),
    }
}

#[test]
fn starts_idle() {
    assert_eq!(CompatGuard::new().mode(), Mode::Idle);
}

#[parameterized(
    idle_engage_legacy = { Mode::Idle, GuardInput::EngageLegacy, Mode::LegacyTrace },
    idle_engage_monitoring = { Mode::Idle, GuardInput::EngageMonitoring, Mode::EventMonitoring },
    idle_release_legacy = { Mode::Idle, GuardInput::ReleaseLegacy, Mode::Idle },
    idle_release_monitoring = { Mode::Idle, GuardInput::ReleaseMonitoring, Mode::Idle },
    legacy_reengage = { Mode::LegacyTrace, GuardInput::EngageLegacy, Mode::LegacyTrace },
    legacy_release = { Mode::LegacyTrace, GuardInput::ReleaseLegacy, Mode::Idle },
    legacy_release_other = { Mode::LegacyTrace, GuardInput::ReleaseMonitoring, Mode::LegacyTrace },
    monitoring_reengage = { Mode::EventMonitoring, GuardInput::EngageMonitoring, Mode::EventMonitoring },
    monitoring_release = { Mode::EventMonitoring, GuardInput::ReleaseMonitoring, Mode::Idle },
    monitoring_release_other = { Mode::EventMonitoring, GuardInput::ReleaseLegacy, Mode::EventMonitoring },
)]
fn allowed_transitions(from: Mode, input: GuardInput, to: Mode) {
    let next = guard_in(from).transition(input).unwrap();
    assert_eq!(next.mode(), to);
}

#[test]
fn legacy_blocks_monitoring() {
    let guard = guard_in(Mode::LegacyTrace);
    let err = guard.transition(GuardInput::EngageMonitoring).unwrap_err();
    assert_eq!(
        err,
        MonitorError::Conflict {
            requested: Mode::EventMonitoring,
            engaged: Mode::LegacyTrace,
        }
    );
    assert_eq!(guard.mode(), Mode::LegacyTrace);
}

#[test]
fn monitoring_blocks_legacy() {
    let guard = guard_in(Mode::EventMonitoring);
    let err = guard.transition(GuardInput::EngageLegacy).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "cannot engage legacy tracing while event monitoring is engaged"
    );
}

#[test]
fn released_mode_lets_the_other_in() {
    let guard = guard_in(Mode::EventMonitoring)
        .transition(GuardInput::ReleaseMonitoring)
        .unwrap();
    let guard = guard.transition(GuardInput::EngageLegacy).unwrap();
    assert_eq!(guard.mode(), Mode::LegacyTrace);
}
