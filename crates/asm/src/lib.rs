// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sonde-asm: text assembly format for sonde programs
//!
//! ```text
//! # factorial
//! fn fact(n)
//!     load n; push 1; le
//!     jump_if_false recurse
//!     push 1; return
//! recurse:
//!     load n; load n; push 1; sub
//!     call fact 1
//!     mul; return
//! end
//! ```
//!
//! Statements on one source line share that line number in the unit's line
//! table. Local names are allocated on first use, parameters first.

mod disasm;
mod parser;

pub use disasm::disassemble;
pub use parser::{parse, AsmError};
