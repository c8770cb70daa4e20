// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Recursive fibonacci; `fib(10)` makes 177 bytecode calls
pub const FIB: &str = r#"fn fib(n)
    load n; push 2; lt
    jump_if_false recurse
    load n; return
recurse:
    load n; push 1; sub; call fib 1
    load n; push 2; sub; call fib 1
    add; return
end

fn main()
    push 10; call fib 1
    return
end
"#;

/// Three source lines in `main`, starting at line 2
pub const SMALL: &str = r#"fn main()
    push 1; store x
    load x; push 2; add
    return
end
"#;

pub const GREET: &str = r#"fn main()
    push "hello"; native print 1; pop
    push "world"; native len 1
    return
end
"#;

pub const DIVIDE: &str = r#"fn main()
    push 1; push 0; div
    return
end
"#;

/// Isolated working directory for one test
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `contents` to `name` inside the test directory
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// `sonde` with config lookup confined to the test directory
    pub fn sonde(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("sonde").expect("sonde binary is built");
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("SONDE_CONFIG")
            .env_remove("SONDE_LOG");
        cmd
    }
}
