// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Legacy per-thread tracing and profiling hooks
//!
//! These predate event monitoring and cannot be combined with it. The
//! monitor's compatibility guard decides which of the two may be engaged.

use crate::value::Value;
use sonde_core::{CodeUnit, Exception};
use std::fmt;
use std::sync::Arc;

/// What a trace hook is told about
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    Call,
    Line(u32),
    Return,
    Exception(Exception),
}

/// What a profile hook is told about
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileEvent {
    Call,
    Return,
    NativeCall(Arc<str>),
    NativeReturn(Arc<str>),
}

pub type TraceFn = Arc<dyn Fn(&CodeUnit, usize, &TraceEvent) + Send + Sync>;
pub type ProfileFn = Arc<dyn Fn(&CodeUnit, usize, &ProfileEvent) + Send + Sync>;

/// Replaces a user function call when it returns `Some`
pub type EvalOverride =
    Arc<dyn Fn(&CodeUnit, &[Value]) -> Option<Result<Value, Exception>> + Send + Sync>;

pub fn trace_hook<F>(f: F) -> TraceFn
where
    F: Fn(&CodeUnit, usize, &TraceEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn profile_hook<F>(f: F) -> ProfileFn
where
    F: Fn(&CodeUnit, usize, &ProfileEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn eval_override<F>(f: F) -> EvalOverride
where
    F: Fn(&CodeUnit, &[Value]) -> Option<Result<Value, Exception>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Installed legacy hooks, published as one snapshot
#[derive(Clone, Default)]
pub struct LegacyHooks {
    pub trace: Option<TraceFn>,
    pub profile: Option<ProfileFn>,
    pub eval_override: Option<EvalOverride>,
}

impl LegacyHooks {
    pub fn is_engaged(&self) -> bool {
        self.trace.is_some() || self.profile.is_some() || self.eval_override.is_some()
    }

    pub(crate) fn trace(&self, unit: &CodeUnit, offset: usize, event: TraceEvent) {
        if let Some(hook) = &self.trace {
            hook(unit, offset, &event);
        }
    }

    pub(crate) fn profile(&self, unit: &CodeUnit, offset: usize, event: ProfileEvent) {
        if let Some(hook) = &self.profile {
            hook(unit, offset, &event);
        }
    }
}

impl fmt::Debug for LegacyHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyHooks")
            .field("trace", &self.trace.is_some())
            .field("profile", &self.profile.is_some())
            .field("eval_override", &self.eval_override.is_some())
            .finish()
    }
}
