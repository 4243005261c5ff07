// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-handler journal and archive directories
//!
//! The journal provisions task work directories under the handler's journal
//! directory, archives processed input files under unique names, and prunes
//! all three infrastructure directories by age.

use baamhackl_core::clock::{Clock, SystemClock};
use baamhackl_core::errors::ErrorStack;
use baamhackl_core::prune::{make_age_filter, Pruner};
use baamhackl_core::uniquename::{self, Generator, NameError};
use baamhackl_core::waryio::{self, WaryError};
use baamhackl_core::HandlerConfig;
use chrono::{TimeDelta, Timelike};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("a non-empty file name is required")]
    EmptyHint,

    #[error(transparent)]
    Wary(#[from] WaryError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("pruning failed: {0}")]
    Prune(ErrorStack),
}

struct DirOptions {
    path: PathBuf,
    naming: uniquename::Options,
}

/// Journal and archive directory management for one handler.
pub struct Journal<C: Clock = SystemClock> {
    cfg: Arc<HandlerConfig>,
    clock: C,

    journal_dir: DirOptions,
    success_dir: DirOptions,
    failure_dir: DirOptions,
}

impl<C: Clock> Journal<C> {
    pub fn new(cfg: Arc<HandlerConfig>, clock: C) -> Self {
        // Task directories are named after the whole file name; archives keep
        // the extension at the end.
        let task_naming = uniquename::Options {
            before_extension: false,
            ..uniquename::Options::default()
        };

        Self {
            journal_dir: DirOptions {
                path: cfg.journal_dir.clone(),
                naming: task_naming,
            },
            success_dir: DirOptions {
                path: cfg.success_dir.clone(),
                naming: uniquename::Options::default(),
            },
            failure_dir: DirOptions {
                path: cfg.failure_dir.clone(),
                naming: uniquename::Options::default(),
            },
            cfg,
            clock,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.cfg
    }

    fn ensure_dir(&self, path: &Path) -> Result<PathBuf, JournalError> {
        Ok(waryio::ensure_rel_dir(&self.cfg.path, path, 0o777)?)
    }

    fn generator_for(&self, dir: &DirOptions, hint: &Path) -> Result<Generator, JournalError> {
        let hint = hint.file_name().ok_or(JournalError::EmptyHint)?;

        let base = self.ensure_dir(&dir.path)?;

        Ok(Generator::with_now(
            &base.join(hint),
            &dir.naming,
            self.clock.now_local(),
        )?)
    }

    /// Create a new unique directory for one task's attempts.
    pub fn create_task_dir(&self, hint: &Path) -> Result<PathBuf, JournalError> {
        let mut names = self.generator_for(&self.journal_dir, hint)?;
        Ok(waryio::make_available_dir(&mut names)?)
    }

    /// Move a processed input file into the success or failure archive,
    /// renaming it to a unique time-prefixed name. Returns the destination.
    pub fn move_to_archive(&self, path: &Path, success: bool) -> Result<PathBuf, JournalError> {
        let dest_dir = if success {
            &self.success_dir
        } else {
            &self.failure_dir
        };

        let mut names = self.generator_for(dest_dir, path)?;
        Ok(waryio::rename_to_available(path, &mut names)?)
    }

    /// Prune journal and archive directories, removing entries older than
    /// the configured retention.
    pub fn prune(&self, cancel: &CancellationToken) -> Result<(), JournalError> {
        let retention = TimeDelta::from_std(self.cfg.journal_retention)
            .unwrap_or_else(|_| TimeDelta::zero());
        let deadline = (self.clock.now_local() - retention)
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or_else(|| self.clock.now_local() - retention);

        let mut pruners = Vec::new();

        for dir in [&self.journal_dir, &self.success_dir, &self.failure_dir] {
            let path = self.ensure_dir(&dir.path)?;

            pruners.push(Pruner {
                dir: path,
                accept: make_age_filter(deadline, dir.naming.clone()),
            });
        }

        tracing::info!(
            handler = %self.cfg.name,
            deadline = %deadline,
            "pruning journal"
        );

        let mut errors = ErrorStack::new();

        for pruner in pruners {
            if let Err(e) = pruner.run(cancel) {
                errors.push(e);
            }
        }

        errors.into_result().map_err(JournalError::Prune)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
