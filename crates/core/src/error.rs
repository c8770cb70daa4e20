// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by the monitoring API

use crate::guard::Mode;
use thiserror::Error;

/// Failure of an activation, marker, or legacy-hook change.
///
/// Every variant is reported before any state is mutated, so a failed call
/// leaves activation, markers, and instrumentation exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("cannot engage {requested} while {engaged} is engaged")]
    Conflict { requested: Mode, engaged: Mode },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot instrument unit {unit}: {reason}")]
    RewriteFailure { unit: String, reason: String },
}

impl MonitorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, MonitorError::Conflict { .. })
    }
}

/// Error returned by a monitoring callback.
///
/// The interpreter turns it into a `CallbackFault` exception raised at the trap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CallbackError {
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
