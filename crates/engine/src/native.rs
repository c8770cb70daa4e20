// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-provided functions callable with the `native` instruction

use crate::value::Value;
use sonde_core::Exception;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, Exception> + Send + Sync>;

/// Table of native functions by name
#[derive(Clone, Default)]
pub struct Natives {
    table: HashMap<Arc<str>, NativeFn>,
}

impl Natives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `str`, `len`, `abs`, and `fail`
    pub fn builtins() -> Self {
        let mut natives = Self::new();
        natives.register("str", |args| {
            let [value] = expect_args::<1>("str", args)?;
            Ok(Value::str(&value.to_string()))
        });
        natives.register("len", |args| match expect_args::<1>("len", args)? {
            [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [other] => Err(Exception::type_error(format!(
                "len() of a {} value",
                other.type_name()
            ))),
        });
        natives.register("abs", |args| match expect_args::<1>("abs", args)? {
            [Value::Int(n)] => n
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| Exception::new("OverflowError", "abs overflowed")),
            [other] => Err(Exception::type_error(format!(
                "abs() of a {} value",
                other.type_name()
            ))),
        });
        natives.register("fail", |args| {
            let [message] = expect_args::<1>("fail", args)?;
            Err(Exception::new("Error", message.to_string()))
        });
        natives
    }

    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, Exception> + Send + Sync + 'static,
    {
        self.table.insert(Arc::from(name), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.table.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|k| &**k)
    }
}

impl fmt::Debug for Natives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Natives").field("names", &names).finish()
    }
}

fn expect_args<const N: usize>(name: &str, args: &[Value]) -> Result<[Value; N], Exception> {
    <[Value; N]>::try_from(args.to_vec()).map_err(|_| {
        Exception::type_error(format!(
            "{}() takes {} arguments, got {}",
            name,
            N,
            args.len()
        ))
    })
}

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
