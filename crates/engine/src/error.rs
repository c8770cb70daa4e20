// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for running programs

use sonde_core::{Exception, MonitorError};
use thiserror::Error;

/// Errors returned to the host by [`crate::Vm`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{function} takes {expected} arguments, got {got}")]
    Arity {
        function: String,
        expected: u8,
        got: usize,
    },
    #[error("uncaught exception: {0}")]
    Uncaught(Exception),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

impl VmError {
    /// The uncaught exception, if that is what ended the run
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            VmError::Uncaught(e) => Some(e),
            _ => None,
        }
    }
}
