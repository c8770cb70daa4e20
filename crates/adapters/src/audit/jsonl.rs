// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSON-lines audit log

use serde::{Deserialize, Serialize};
use sonde_core::{AuditHook, AuditRecord};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur reading or writing the audit log
#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One line of the audit log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedRecord {
    pub seq: u64,
    #[serde(flatten)]
    pub record: AuditRecord,
}

struct Writer {
    file: File,
    sequence: u64,
}

/// Audit hook that appends every record to a file, one JSON object per line.
///
/// Sequence numbers continue from the records already in the file.
pub struct JsonlAuditLog {
    path: PathBuf,
    writer: Mutex<Writer>,
}

impl JsonlAuditLog {
    /// Open or create an audit log at the given path
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditLogError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let reader = BufReader::new(File::open(&path)?);
        let mut sequence = 0;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                sequence += 1;
            }
        }

        tracing::debug!(path = %path.display(), sequence, "audit log opened");
        Ok(Self {
            path,
            writer: Mutex::new(Writer { file, sequence }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last record written
    pub fn sequence(&self) -> u64 {
        self.writer.lock().unwrap_or_else(|e| e.into_inner()).sequence
    }

    /// Append a record, returning its sequence number
    pub fn append(&self, record: &AuditRecord) -> Result<u64, AuditLogError> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let entry = LoggedRecord {
            seq: writer.sequence + 1,
            record: record.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(writer.file, "{}", line)?;
        writer.file.flush()?;
        writer.sequence = entry.seq;
        Ok(entry.seq)
    }

    /// Read every record from the log at `path`; a missing file is empty
    pub fn read_all(path: &Path) -> Result<Vec<LoggedRecord>, AuditLogError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|source| AuditLogError::Json {
                line: index + 1,
                source,
            })?;
            records.push(entry);
        }
        Ok(records)
    }
}

impl AuditHook for JsonlAuditLog {
    fn record(&self, record: &AuditRecord) {
        if let Err(e) = self.append(record) {
            tracing::warn!(
                path = %self.path.display(),
                event = record.name(),
                error = %e,
                "failed to write audit record"
            );
        }
    }
}

impl std::fmt::Debug for JsonlAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlAuditLog")
            .field("path", &self.path)
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
