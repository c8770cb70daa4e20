// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit hook implementations

mod jsonl;
mod noop;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use jsonl::{AuditLogError, JsonlAuditLog, LoggedRecord};
pub use noop::NoOpAuditHook;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAuditHook;
