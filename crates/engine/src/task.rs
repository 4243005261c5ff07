// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-attempt task for one changed file
//!
//! Wraps the attempt executor with retry-state management: the journal
//! directory is created once and reused, every attempt gets its own numbered
//! workspace, and failures carry a fuzzed backoff delay back to the
//! scheduler until the retry budget runs out.

use crate::attempt::{Attempt, AttemptOptions, ChangeGate};
use crate::journal::Journal;
use crate::teelog::TeeLog;
use baamhackl_core::clock::Clock;
use baamhackl_core::fuzz::fuzz;
use baamhackl_core::retry::RetryStrategy;
use baamhackl_core::scheduler::Outcome;
use baamhackl_core::waryio;
use baamhackl_core::HandlerConfig;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const RETRY_FUZZ_FACTOR: f64 = 0.1;

/// One pending changed file and its attempt history.
pub struct HandlerTask<C: Clock> {
    cfg: Arc<HandlerConfig>,
    journal: Arc<Journal<C>>,

    /// Cleaned handler-relative name of the changed file.
    name: PathBuf,

    retry: Option<RetryStrategy>,
    current_attempt: u32,
    journal_dir: Option<PathBuf>,
}

impl<C: Clock> HandlerTask<C> {
    pub fn new(cfg: Arc<HandlerConfig>, journal: Arc<Journal<C>>, name: PathBuf) -> Self {
        Self {
            cfg,
            journal,
            name,
            retry: None,
            current_attempt: 0,
            journal_dir: None,
        }
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    fn ensure_journal_dir(&mut self) -> Result<PathBuf, Outcome> {
        if let Some(dir) = &self.journal_dir {
            return Ok(dir.clone());
        }

        match self.journal.create_task_dir(&self.name) {
            Ok(dir) => {
                self.journal_dir = Some(dir.clone());
                Ok(dir)
            }
            Err(e) => Err(Outcome::permanent(e)),
        }
    }

    /// Run one attempt. The gate serializes the archive decision with the
    /// owning handler.
    pub async fn run(&mut self, cancel: &CancellationToken, gate: &mut dyn ChangeGate) -> Outcome {
        let attempt_index = self.current_attempt;
        self.current_attempt += 1;

        tracing::info!(
            handler = %self.cfg.name,
            name = %self.name.display(),
            attempt = attempt_index,
            "handling changed file"
        );

        let journal_dir = match self.ensure_journal_dir() {
            Ok(dir) => dir,
            Err(outcome) => return outcome,
        };

        let retry = self
            .retry
            .get_or_insert_with(|| RetryStrategy::new(&self.cfg));
        let retry_delay = retry.current();

        let log = TeeLog::new(journal_dir.join("log.txt"));
        let mut log = match log.open() {
            Ok(writer) => writer,
            Err(e) => return Outcome::permanent(e),
        };

        let base_dir = match waryio::ensure_rel_dir(
            &journal_dir,
            Path::new(&attempt_index.to_string()),
            0o777,
        ) {
            Ok(dir) => dir,
            Err(e) => return Outcome::permanent(e),
        };

        let attempt = Attempt::new(AttemptOptions {
            config: Arc::clone(&self.cfg),
            journal: Arc::clone(&self.journal),
            changed_file: self.cfg.path.join(&self.name),
            base_dir,
            final_attempt: retry_delay.is_none(),
        });

        let attempt = match attempt {
            Ok(attempt) => attempt,
            Err(e) => return Outcome::permanent(e),
        };

        let (permanent, result) = attempt.run(cancel, gate, &mut log).await;

        let error = match result {
            Ok(()) => None,
            Err(e) => {
                log.error(
                    "handling file change failed",
                    json!({"attempt": attempt_index, "error": e.to_string()}),
                );
                Some(e)
            }
        };

        if let Err(e) = log.close() {
            tracing::warn!(
                handler = %self.cfg.name,
                name = %self.name.display(),
                error = %e,
                "closing attempt log failed"
            );
        }

        match (permanent, error) {
            (_, None) => Outcome::Success,
            (true, Some(e)) => Outcome::permanent(e),
            (false, Some(e)) => match retry_delay {
                // Retry budget exhausted; the failure becomes permanent.
                None => Outcome::permanent(e),
                Some(delay) => {
                    if let Some(retry) = &mut self.retry {
                        retry.advance();
                    }
                    Outcome::transient(e, fuzz(delay, RETRY_FUZZ_FACTOR, &mut rand::thread_rng()))
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
