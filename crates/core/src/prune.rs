// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Age-filtered directory cleanup under an exclusive lock
//!
//! Only one pruner may work on a directory at a time; contention is reported
//! immediately instead of waiting. Entries are removed when the filter
//! accepts them, tolerating concurrent removal.

use crate::errors::{Cancelled, ErrorStack};
use crate::uniquename;
use chrono::{DateTime, Local};
use fs2::FileExt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const LOCK_NAME: &str = ".prune.lock";

/// Decides whether a directory entry should be removed.
pub type AcceptFn = Box<dyn Fn(&str, &Metadata) -> bool + Send + Sync>;

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("prune lock unavailable: {}", .path.display())]
    Unavailable { path: PathBuf },

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Failed(ErrorStack),
}

/// Removes directory entries accepted by the filter function.
pub struct Pruner {
    pub dir: PathBuf,
    pub accept: AcceptFn,
}

impl Pruner {
    /// Prune the directory. Fails fast with [`PruneError::Unavailable`] when
    /// another pruner holds the lock. Cancellation stops the scan between
    /// entries and is reported alongside any accumulated errors.
    pub fn run(&self, cancel: &CancellationToken) -> Result<(), PruneError> {
        let lock_path = self.dir.join(LOCK_NAME);

        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| PruneError::Io {
                op: "open",
                path: lock_path.clone(),
                source: e,
            })?;

        if let Err(e) = lock_file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(PruneError::Unavailable { path: lock_path });
            }
            return Err(PruneError::Io {
                op: "flock",
                path: lock_path,
                source: e,
            });
        }

        let result = self.run_locked(cancel);

        let _ = fs2::FileExt::unlock(&lock_file);

        result
    }

    fn run_locked(&self, cancel: &CancellationToken) -> Result<(), PruneError> {
        let mut entries: Vec<_> = std::fs::read_dir(&self.dir)
            .map_err(|e| PruneError::Io {
                op: "readdir",
                path: self.dir.clone(),
                source: e,
            })?
            .filter_map(Result::ok)
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut errors = ErrorStack::new();

        for entry in entries {
            if cancel.is_cancelled() {
                errors.push(Cancelled);
                break;
            }

            let name = entry.file_name();
            if name == LOCK_NAME {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            let name_str = name.to_string_lossy();
            if !(self.accept)(&name_str, &metadata) {
                continue;
            }

            tracing::info!(
                dir = %self.dir.display(),
                entry = %name_str,
                "removing entry"
            );

            let path = entry.path();
            let removal = if metadata.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };

            match removal {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => errors.push(PruneError::Io {
                    op: "remove",
                    path,
                    source: e,
                }),
            }
        }

        errors.into_result().map_err(PruneError::Failed)
    }
}

/// Build an acceptor permitting only entries older than the deadline. Both
/// the modification time and, when the name embeds one, the timestamp in the
/// name must be at or before the deadline.
pub fn make_age_filter(deadline: DateTime<Local>, opts: uniquename::Options) -> AcceptFn {
    Box::new(move |name, metadata| {
        let mtime = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .unwrap_or(deadline);

        if mtime > deadline {
            return false;
        }

        match uniquename::extract_time(Path::new(name), &opts) {
            Ok(ts) => ts < deadline,
            Err(_) => true,
        }
    })
}

#[cfg(test)]
#[path = "prune_tests.rs"]
mod tests;
