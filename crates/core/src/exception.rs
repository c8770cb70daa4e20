// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exception objects raised inside monitored programs

use crate::error::CallbackError;
use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A program-level fault: a kind name and a message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub kind: String,
    pub message: String,
}

impl Exception {
    pub const CALLBACK_FAULT: &'static str = "CallbackFault";

    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Fault raised at a trap whose callback failed
    pub fn callback_fault(kind: EventKind, error: &CallbackError) -> Self {
        Self::new(
            Self::CALLBACK_FAULT,
            format!("{} callback failed: {}", kind, error.message),
        )
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}
