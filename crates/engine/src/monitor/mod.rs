// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event monitoring controller
//!
//! Every state change runs the same pipeline under one lock: validate the
//! arguments, check the compatibility guard, plan the rewrite of every
//! affected unit, install the plan, then notify the audit hook. Failure at
//! any step before installation leaves all state untouched.

mod activation;
mod dispatch;
mod markers;
mod rewrite;

pub use dispatch::{callback, in_callback, Callback, EventArgs, MonitorEvent};
pub(crate) use rewrite::committed_here;

use crate::frame::StackView;
use crate::legacy::{EvalOverride, LegacyHooks, ProfileFn, TraceFn};
use activation::ActivationState;
use dispatch::{invoke, CallbackTable};
use markers::MarkerTable;
use rewrite::RewritePlan;
use sonde_core::{
    AuditHook, AuditRecord, CodeUnit, CompatGuard, EventKind, EventSet, Exception, GuardInput,
    LegacyHookKind, MarkerId, Mode, MonitorError, Retirements, UnitId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

/// Audit hook that discards records
struct Silent;

impl AuditHook for Silent {
    fn record(&self, _record: &AuditRecord) {}
}

struct MonitorState {
    guard: CompatGuard,
    activation: ActivationState,
    markers: MarkerTable,
    units: HashMap<UnitId, Weak<CodeUnit>>,
    version: u64,
}

/// Which units a change must re-instrument
enum Affected<'a> {
    All,
    One(&'a Arc<CodeUnit>),
}

/// Process-wide monitoring state shared by every interpreter thread
pub struct Monitor {
    state: Mutex<MonitorState>,
    callbacks: RwLock<CallbackTable>,
    legacy: RwLock<Arc<LegacyHooks>>,
    legacy_engaged: AtomicBool,
    retirements: Arc<Retirements>,
    audit: Arc<dyn AuditHook>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::with_audit(Arc::new(Silent))
    }

    pub fn with_audit(audit: Arc<dyn AuditHook>) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                guard: CompatGuard::new(),
                activation: ActivationState::default(),
                markers: MarkerTable::default(),
                units: HashMap::new(),
                version: 0,
            }),
            callbacks: RwLock::new(CallbackTable::default()),
            legacy: RwLock::new(Arc::new(LegacyHooks::default())),
            legacy_engaged: AtomicBool::new(false),
            retirements: Arc::new(Retirements::new()),
            audit,
        }
    }

    /// Which facility is engaged
    pub fn mode(&self) -> Mode {
        self.lock().guard.mode()
    }

    /// Number of live units known to the monitor
    pub fn unit_count(&self) -> usize {
        self.lock().units.len()
    }

    /// Register `unit` and instrument it for the current global set
    pub fn attach(&self, unit: &Arc<CodeUnit>) -> Result<(), MonitorError> {
        let mut state = self.lock();
        let events = state.activation.effective(unit.id());
        let mut plan = RewritePlan::new();
        plan.stage(unit, events, state.markers.for_unit(unit.id()), state.version)?;
        if !unit.attach(&self.retirements) {
            return Err(MonitorError::InvalidArgument(format!(
                "unit {} is attached to another monitor",
                unit.name()
            )));
        }
        plan.commit();
        state.units.insert(unit.id(), Arc::downgrade(unit));
        tracing::debug!(unit = unit.name(), id = %unit.id(), events = %events, "unit attached");
        Ok(())
    }

    pub fn get_global_events(&self) -> EventSet {
        self.lock().activation.global()
    }

    /// Replace the global activation set and re-instrument every unit
    pub fn set_global_events(&self, events: EventSet) -> Result<(), MonitorError> {
        events.validate_activatable()?;
        let mut state = self.lock();
        let previous = state.activation.global();

        let mut activation = state.activation.clone();
        activation.set_global(events);
        let markers = state.markers.clone();
        let changed = self.apply(&mut state, activation, markers, Affected::All)?;

        self.audit.record(&AuditRecord::SetGlobalEvents {
            previous,
            current: events,
        });
        tracing::info!(previous = %previous, current = %events, units = changed, "global events set");
        Ok(())
    }

    pub fn get_local_events(&self, unit: &CodeUnit) -> EventSet {
        self.lock().activation.local(unit.id())
    }

    /// Replace the local activation set of one unit
    pub fn set_local_events(&self, unit: &Arc<CodeUnit>, events: EventSet) -> Result<(), MonitorError> {
        events.validate_activatable()?;
        let mut state = self.lock();
        Self::check_attached(&state, unit)?;
        let previous = state.activation.local(unit.id());

        let mut activation = state.activation.clone();
        activation.set_local(unit.id(), events);
        let markers = state.markers.clone();
        let changed = self.apply(&mut state, activation, markers, Affected::One(unit))?;

        self.audit.record(&AuditRecord::SetLocalEvents {
            unit: unit.name().to_string(),
            unit_id: unit.id().0,
            previous,
            current: events,
        });
        tracing::info!(
            unit = unit.name(),
            previous = %previous,
            current = %events,
            units = changed,
            "local events set"
        );
        Ok(())
    }

    /// Install or clear the callback for `kind`, returning the previous one
    pub fn register_callback(&self, kind: EventKind, callback: Option<Callback>) -> Option<Callback> {
        let _state = self.lock();
        let installed = callback.is_some();
        let previous = self
            .callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set(kind, callback);

        self.audit.record(&AuditRecord::RegisterCallback {
            kind,
            replaced: previous.is_some(),
            installed,
        });
        tracing::debug!(kind = %kind, replaced = previous.is_some(), installed, "callback registered");
        previous
    }

    /// Arm `marker_id` at `offset` in `unit`, replacing any marker there
    pub fn insert_marker(
        &self,
        unit: &Arc<CodeUnit>,
        offset: usize,
        marker_id: u32,
    ) -> Result<(), MonitorError> {
        let marker = MarkerId::try_from(marker_id)?;
        if offset >= unit.len() {
            return Err(MonitorError::InvalidArgument(format!(
                "offset {} outside unit {} of length {}",
                offset,
                unit.name(),
                unit.len()
            )));
        }
        let mut state = self.lock();
        Self::check_attached(&state, unit)?;

        let activation = state.activation.clone();
        let mut markers = state.markers.clone();
        let previous = markers.insert(unit.id(), offset, marker);
        self.apply(&mut state, activation, markers, Affected::One(unit))?;

        self.audit.record(&AuditRecord::InsertMarker {
            unit: unit.name().to_string(),
            unit_id: unit.id().0,
            offset,
            marker,
            previous,
        });
        tracing::info!(unit = unit.name(), offset, marker = %marker, "marker inserted");
        Ok(())
    }

    /// Disarm the marker at `offset`; absent markers are ignored
    pub fn remove_marker(&self, unit: &Arc<CodeUnit>, offset: usize) -> Result<(), MonitorError> {
        let mut state = self.lock();
        let mut markers = state.markers.clone();
        let Some(marker) = markers.remove(unit.id(), offset) else {
            return Ok(());
        };
        let activation = state.activation.clone();
        self.apply(&mut state, activation, markers, Affected::One(unit))?;

        self.audit.record(&AuditRecord::RemoveMarker {
            unit: unit.name().to_string(),
            unit_id: unit.id().0,
            offset,
            marker,
        });
        tracing::info!(unit = unit.name(), offset, marker = %marker, "marker removed");
        Ok(())
    }

    pub fn marker_at(&self, unit: &CodeUnit, offset: usize) -> Option<MarkerId> {
        self.lock().markers.get(unit.id(), offset)
    }

    /// Install or clear the legacy trace hook
    pub fn set_trace(&self, hook: Option<TraceFn>) -> Result<(), MonitorError> {
        self.set_legacy(LegacyHookKind::Trace, |hooks| hooks.trace = hook)
    }

    /// Install or clear the legacy profile hook
    pub fn set_profile(&self, hook: Option<ProfileFn>) -> Result<(), MonitorError> {
        self.set_legacy(LegacyHookKind::Profile, |hooks| hooks.profile = hook)
    }

    /// Install or clear the frame-evaluation override
    pub fn set_eval_override(&self, hook: Option<EvalOverride>) -> Result<(), MonitorError> {
        self.set_legacy(LegacyHookKind::EvalOverride, |hooks| hooks.eval_override = hook)
    }

    /// Installed legacy hooks, or `None` when none are engaged
    pub(crate) fn legacy_hooks(&self) -> Option<Arc<LegacyHooks>> {
        if !self.legacy_engaged.load(Ordering::Acquire) {
            return None;
        }
        Some(Arc::clone(&self.legacy.read().unwrap_or_else(|e| e.into_inner())))
    }

    /// Deliver one event to the callback registered for `kind`
    pub(crate) fn dispatch(
        &self,
        kind: EventKind,
        unit: &Arc<CodeUnit>,
        args: EventArgs,
        stack: StackView<'_>,
    ) -> Result<(), Exception> {
        if in_callback() {
            return Ok(());
        }
        let callback = {
            let table = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
            match table.get(kind) {
                Some(cb) => Arc::clone(cb),
                None => return Ok(()),
            }
        };
        let event = MonitorEvent {
            kind,
            unit,
            args,
            stack,
        };
        invoke(&callback, &event)
    }

    fn set_legacy(
        &self,
        hook: LegacyHookKind,
        update: impl FnOnce(&mut LegacyHooks),
    ) -> Result<(), MonitorError> {
        let mut state = self.lock();
        let mut hooks = LegacyHooks::clone(&self.legacy.read().unwrap_or_else(|e| e.into_inner()));
        update(&mut hooks);
        let engaged = hooks.is_engaged();
        let installed = match hook {
            LegacyHookKind::Trace => hooks.trace.is_some(),
            LegacyHookKind::Profile => hooks.profile.is_some(),
            LegacyHookKind::EvalOverride => hooks.eval_override.is_some(),
        };

        let guard = state.guard.transition(GuardInput::legacy(engaged)).inspect_err(|e| {
            tracing::warn!(hook = ?hook, error = %e, "legacy hook rejected");
        })?;

        *self.legacy.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(hooks);
        self.legacy_engaged.store(engaged, Ordering::Release);
        state.guard = guard;

        self.audit.record(&AuditRecord::SetLegacyHook { hook, installed });
        tracing::info!(hook = ?hook, installed, mode = %guard.mode(), "legacy hook set");
        Ok(())
    }

    /// Validate against the guard, rewrite affected units, then commit state.
    ///
    /// Returns how many units got a new executable.
    fn apply(
        &self,
        state: &mut MonitorState,
        activation: ActivationState,
        markers: MarkerTable,
        affected: Affected<'_>,
    ) -> Result<usize, MonitorError> {
        let engaged = activation.is_engaged() || !markers.is_empty();
        let guard = state
            .guard
            .transition(GuardInput::monitoring(engaged))
            .inspect_err(|e| tracing::warn!(error = %e, "monitoring change rejected"))?;

        let version = state.version + 1;
        let units: Vec<Arc<CodeUnit>> = match affected {
            Affected::All => state.units.values().filter_map(Weak::upgrade).collect(),
            Affected::One(unit) => vec![Arc::clone(unit)],
        };
        let mut plan = RewritePlan::new();
        for unit in &units {
            plan.stage(
                unit,
                activation.effective(unit.id()),
                markers.for_unit(unit.id()),
                version,
            )
            .inspect_err(|e| tracing::warn!(error = %e, "rewrite failed, nothing changed"))?;
        }

        let changed = plan.commit();
        state.activation = activation;
        state.markers = markers;
        state.guard = guard;
        state.version = version;
        Ok(changed)
    }

    fn check_attached(state: &MonitorState, unit: &CodeUnit) -> Result<(), MonitorError> {
        if state.units.contains_key(&unit.id()) {
            Ok(())
        } else {
            Err(MonitorError::InvalidArgument(format!(
                "unit {} is not attached",
                unit.name()
            )))
        }
    }

    /// Take the state lock, dropping state for units that no longer exist
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let retired = self.retirements.drain();
        if !retired.is_empty() {
            for id in &retired {
                state.units.remove(id);
                state.activation.forget(*id);
                state.markers.forget(*id);
            }
            let engaged = state.activation.is_engaged() || !state.markers.is_empty();
            if let Ok(guard) = state.guard.transition(GuardInput::monitoring(engaged)) {
                state.guard = guard;
            }
            tracing::debug!(count = retired.len(), "retired units reaped");
        }
        state
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
