// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing errors with context and suggestions

use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The requested entry function is not in the program
    pub fn unknown_entry(entry: &str, file: &str, available: &[&str]) -> Self {
        let err = CliError::new(format!("function '{}' not found in {}", entry, file));
        let err = if available.is_empty() {
            err.with_context("the program defines no functions")
        } else {
            err.with_context(format!("defined functions: {}", available.join(", ")))
        };
        err.with_suggestion("Pick another entry point: sonde run FILE --entry NAME")
            .with_suggestion(format!("Inspect the program: sonde check {}", file))
    }

    /// Monitoring was refused because a legacy hook is installed, or vice versa
    pub fn conflict(detail: impl fmt::Display) -> Self {
        CliError::new(format!("{}", detail))
            .with_context("event monitoring and legacy tracing cannot be engaged together")
            .with_suggestion("Run without --events, --local or --marker")
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
