// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task NDJSON log tee
//!
//! Task-lifecycle events are forwarded to the process-wide `tracing`
//! subscriber and appended to a newline-delimited JSON file inside the
//! task's journal directory, so operators inspecting the journal have a
//! self-contained record.

use chrono::{Local, SecondsFormat};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TeeLogError {
    #[error("opening log {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing log {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A log file shared by all attempts of one task.
pub struct TeeLog {
    path: PathBuf,
}

impl TeeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(&self) -> Result<TeeWriter, TeeLogError> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| TeeLogError::Open {
                path: self.path.clone(),
                source,
            })?;

        Ok(TeeWriter {
            path: self.path.clone(),
            file,
            write_error: None,
        })
    }
}

/// Writer appending NDJSON records while forwarding to `tracing`.
pub struct TeeWriter {
    path: PathBuf,
    file: File,
    write_error: Option<std::io::Error>,
}

impl TeeWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, msg: &str, fields: Value) {
        tracing::info!(target: "baamhackl::task", fields = %fields, "{}", msg);
        self.record("info", msg, fields);
    }

    pub fn warn(&mut self, msg: &str, fields: Value) {
        tracing::warn!(target: "baamhackl::task", fields = %fields, "{}", msg);
        self.record("warn", msg, fields);
    }

    pub fn error(&mut self, msg: &str, fields: Value) {
        tracing::error!(target: "baamhackl::task", fields = %fields, "{}", msg);
        self.record("error", msg, fields);
    }

    fn record(&mut self, level: &str, msg: &str, fields: Value) {
        let mut record = Map::new();
        record.insert(
            "ts".to_string(),
            json!(Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)),
        );
        record.insert("level".to_string(), json!(level));
        record.insert("msg".to_string(), json!(msg));

        if let Value::Object(extra) = fields {
            for (key, value) in extra {
                record.insert(key, value);
            }
        }

        let line = Value::Object(record).to_string();

        if let Err(e) = writeln!(self.file, "{line}") {
            if self.write_error.is_none() {
                self.write_error = Some(e);
            }
        }
    }

    /// Flush and report any write error encountered along the way.
    pub fn close(mut self) -> Result<(), TeeLogError> {
        let result = match self.write_error.take() {
            Some(source) => Err(source),
            None => self.file.flush(),
        };

        result.map_err(|source| TeeLogError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "teelog_tests.rs"]
mod tests;
