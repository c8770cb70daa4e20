// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sonde-engine: interpreter and event monitoring controller

mod error;
mod frame;
mod interp;
pub mod legacy;
pub mod monitor;
mod native;
mod value;

pub use error::VmError;
pub use frame::{FrameInfo, StackView};
pub use interp::{Vm, VmConfig};
pub use legacy::{LegacyHooks, ProfileEvent, TraceEvent};
pub use monitor::{callback, Callback, EventArgs, Monitor, MonitorEvent};
pub use native::{NativeFn, Natives};
pub use value::{Generator, Value};
