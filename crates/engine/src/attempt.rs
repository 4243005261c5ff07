// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One handler command invocation for one changed file
//!
//! The changed file is archived if and only if it still exists and remains
//! unchanged from before running the handler command. This protects edits
//! made concurrently with command execution from being destroyed.

use crate::command::{CommandError, CommandOptions, HandlerCommand};
use crate::journal::{Journal, JournalError};
use crate::teelog::TeeWriter;
use async_trait::async_trait;
use baamhackl_core::clock::Clock;
use baamhackl_core::errors::ErrorStack;
use baamhackl_core::waryio;
use baamhackl_core::HandlerConfig;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Capability to serialize mutation of the handler's filesystem. Acquired
/// lazily after the command finishes so commands never block each other.
#[async_trait]
pub trait ChangeGate: Send {
    async fn acquire(&mut self);
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("file vanished before running command: {}", .0.display())]
    Vanished(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotRegular(PathBuf),

    #[error("lstat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Failed(ErrorStack),
}

pub struct AttemptOptions<C: Clock> {
    pub config: Arc<HandlerConfig>,
    pub journal: Arc<Journal<C>>,

    /// Path to the changed file.
    pub changed_file: PathBuf,

    /// Directory for storing execution-related files.
    pub base_dir: PathBuf,

    /// Whether the attempt is the last one before giving up.
    pub final_attempt: bool,
}

/// One prepared command invocation for one changed file.
pub struct Attempt<C: Clock> {
    opts: AttemptOptions<C>,
    command: HandlerCommand,
}

impl<C: Clock> Attempt<C> {
    pub fn new(opts: AttemptOptions<C>) -> Result<Self, AttemptError> {
        let command = HandlerCommand::new(CommandOptions {
            source_file: opts.changed_file.clone(),
            base_dir: opts.base_dir.clone(),
            argv: opts.config.command.clone(),
        })?;

        Ok(Self { opts, command })
    }

    fn move_to_archive(&self, success: bool, log: &mut TeeWriter) -> Result<(), JournalError> {
        let dest = self
            .opts
            .journal
            .move_to_archive(&self.opts.changed_file, success)?;

        log.info(
            "moved changed file",
            json!({
                "source": self.opts.changed_file.display().to_string(),
                "dest": dest.display().to_string(),
            }),
        );

        Ok(())
    }

    /// Run the attempt. Returns whether the outcome is permanent (must not
    /// be retried) together with the combined result.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        gate: &mut dyn ChangeGate,
        log: &mut TeeWriter,
    ) -> (bool, Result<(), AttemptError>) {
        let changed = &self.opts.changed_file;

        let stat_before = match changed.symlink_metadata() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return (true, Err(AttemptError::Vanished(changed.clone())));
            }
            Err(e) => {
                return (
                    true,
                    Err(AttemptError::Stat {
                        path: changed.clone(),
                        source: e,
                    }),
                );
            }
            Ok(md) if !md.is_file() => {
                return (true, Err(AttemptError::NotRegular(changed.clone())));
            }
            Ok(md) => md,
        };

        log.info(
            "file information",
            json!({
                "name": changed.display().to_string(),
                "size": stat_before.len(),
            }),
        );

        let command_result = self
            .command
            .run(cancel, self.opts.config.timeout, log)
            .await;

        // Serialize the archive-or-leave decision with the handler.
        gate.acquire().await;

        let mut permanent = false;
        let mut errors = ErrorStack::new();
        let command_ok = command_result.is_ok();

        if let Err(e) = command_result {
            errors.push(e);
        }

        match changed.symlink_metadata() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Tolerate a missing file if and only if the command
                // succeeded; there is no point in retrying either way.
                if !command_ok {
                    errors.push(AttemptError::Vanished(changed.clone()));
                }
                permanent = true;
            }
            Err(e) => {
                errors.push(AttemptError::Stat {
                    path: changed.clone(),
                    source: e,
                });
            }
            Ok(stat_after) => {
                let changes = waryio::describe_changes(&stat_before, &stat_after);

                if !changes.is_empty() {
                    if let Err(e) = changes.into_result() {
                        errors.push(e);
                    }
                } else if self.opts.final_attempt || command_ok {
                    if let Err(e) = self.move_to_archive(command_ok, log) {
                        errors.push(e);
                    }
                }
            }
        }

        (permanent, errors.into_result().map_err(AttemptError::Failed))
    }
}

#[cfg(test)]
#[path = "attempt_tests.rs"]
mod tests;
