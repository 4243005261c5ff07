// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled task state and outcomes

use crate::errors::BoxError;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Future produced by one task invocation.
pub type TaskFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;

/// A task function. Called whenever it is the task's turn; the cancellation
/// token is shared by all tasks and fires when the scheduler shuts down.
pub type TaskFn = Box<dyn FnMut(CancellationToken) -> TaskFuture + Send>;

/// The result of one task invocation, consumed directly by the scheduler.
#[derive(Debug)]
pub enum Outcome {
    /// The task is finished and leaves the scheduler.
    Success,

    /// The task failed and must not run again.
    Permanent { error: BoxError },

    /// The task failed and wants another invocation after the given delay.
    Transient { error: BoxError, delay: Duration },
}

impl Outcome {
    pub fn permanent(error: impl Into<BoxError>) -> Self {
        Self::Permanent {
            error: error.into(),
        }
    }

    pub fn transient(error: impl Into<BoxError>, delay: Duration) -> Self {
        Self::Transient {
            error: error.into(),
            delay,
        }
    }

    /// Whether the task is resolved: it will not be invoked again.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Transient { .. })
    }

    pub fn error(&self) -> Option<&BoxError> {
        match self {
            Self::Success => None,
            Self::Permanent { error } | Self::Transient { error, .. } => Some(error),
        }
    }
}

/// One scheduled task, owned by exactly one queue or the active runner.
pub(super) struct Task {
    fn_: TaskFn,

    /// Unique nonzero sequence number; orders the FIFO queue.
    pub(super) seq: u64,

    /// Run the task only after this point in time. `None` means FIFO.
    pub(super) next_after: Option<Instant>,

    /// Number of the next invocation.
    pub(super) attempt_count: u32,
}

impl Task {
    pub(super) fn new(fn_: TaskFn, seq: u64, next_after: Option<Instant>) -> Self {
        Self {
            fn_,
            seq,
            next_after,
            attempt_count: 0,
        }
    }

    /// Invoke the task once and log the result.
    pub(super) async fn run(&mut self, cancel: CancellationToken) -> Outcome {
        let attempt = self.attempt_count;
        self.attempt_count += 1;

        tracing::info!(seq = self.seq, attempt, "starting task");

        let outcome = (self.fn_)(cancel).await;

        match &outcome {
            Outcome::Success => {
                tracing::info!(seq = self.seq, attempt, "task successful");
            }
            Outcome::Permanent { error } => {
                tracing::error!(seq = self.seq, attempt, error = %error, "task failed permanently");
            }
            Outcome::Transient { error, delay } => {
                tracing::error!(
                    seq = self.seq,
                    attempt,
                    error = %error,
                    retry_delay = ?delay,
                    "task failed and will be attempted again"
                );
            }
        }

        outcome
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
