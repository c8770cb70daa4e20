// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sonde-core: shared types for the sonde execution monitor
//!
//! This crate provides:
//! - Event kinds, event sets, and the static event registry
//! - Code units, their bytecode, and their instrumented executable form
//! - The compatibility guard between event monitoring and legacy tracing
//! - Error and audit record types

pub mod audit;
pub mod code;
pub mod error;
pub mod event;
pub mod exception;
pub mod executable;
pub mod guard;
pub mod registry;

pub use audit::{AuditHook, AuditRecord, LegacyHookKind};
pub use code::{CodeError, CodeUnit, Constant, Instr, Program, Retirements, UnitId};
pub use error::{CallbackError, MonitorError};
pub use event::{EventKind, EventSet};
pub use exception::Exception;
pub use executable::{Executable, MarkerId, Trap};
pub use guard::{CompatGuard, GuardInput, Mode};
pub use registry::{ArgShape, EventSpec};
