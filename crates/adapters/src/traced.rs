// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced audit wrapper for consistent observability

use sonde_core::{AuditHook, AuditRecord};

/// Wrapper that logs every audit record before forwarding it
#[derive(Clone, Debug, Default)]
pub struct TracedAuditHook<H> {
    inner: H,
}

impl<H> TracedAuditHook<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: AuditHook> AuditHook for TracedAuditHook<H> {
    fn record(&self, record: &AuditRecord) {
        let span = tracing::info_span!("audit", event = record.name());
        let _guard = span.enter();

        let fields = record
            .fields()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(%fields, "state changed");

        let start = std::time::Instant::now();
        self.inner.record(record);
        tracing::trace!(elapsed_us = start.elapsed().as_micros() as u64, "recorded");
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
