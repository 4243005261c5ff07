// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-handler change dispatch and deduplication
//!
//! Each handler owns a set of pending file names. A file name is pending
//! exactly while a task for it is queued or executing; further change events
//! for the same cleaned name are dropped until the task resolves. The same
//! lock serializes archive decisions at the tail of an attempt, acquired
//! lazily so handler commands never block each other.

use crate::attempt::ChangeGate;
use crate::event::ChangeEvent;
use crate::journal::Journal;
use crate::task::HandlerTask;
use async_trait::async_trait;
use baamhackl_core::clock::Clock;
use baamhackl_core::relpath;
use baamhackl_core::scheduler::{Outcome, Scheduler};
use baamhackl_core::waryio::{self, WaryError};
use baamhackl_core::HandlerConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("root directory in request differs from configuration")]
    RootMismatch,

    #[error(transparent)]
    Wary(#[from] WaryError),
}

type PendingSet = HashSet<PathBuf>;

/// Lazily acquired exclusive access to a handler's pending state. Handed to
/// the running task as a capability; the guard, once taken, is held until
/// the task invocation finishes.
pub struct PendingGuard {
    pending: Arc<Mutex<PendingSet>>,
    guard: Option<OwnedMutexGuard<PendingSet>>,
}

impl PendingGuard {
    fn new(pending: Arc<Mutex<PendingSet>>) -> Self {
        Self {
            pending,
            guard: None,
        }
    }

    fn locked(&mut self) -> Option<&mut PendingSet> {
        self.guard.as_deref_mut()
    }
}

#[async_trait]
impl ChangeGate for PendingGuard {
    async fn acquire(&mut self) {
        if self.guard.is_none() {
            self.guard = Some(Arc::clone(&self.pending).lock_owned().await);
        }
    }
}

/// One configured handler: deduplicates changes and dispatches tasks.
pub struct Handler<C: Clock> {
    cfg: Arc<HandlerConfig>,
    journal: Arc<Journal<C>>,
    pending: Arc<Mutex<PendingSet>>,

    /// Root-relative infrastructure directories to ignore events under.
    infra_dirs: Vec<PathBuf>,
}

impl<C: Clock> Handler<C> {
    pub fn new(cfg: Arc<HandlerConfig>, clock: C) -> Self {
        let journal = Arc::new(Journal::new(Arc::clone(&cfg), clock));
        let infra_dirs = cfg.infra_dirs();

        Self {
            cfg,
            journal,
            pending: Arc::new(Mutex::new(HashSet::new())),
            infra_dirs,
        }
    }

    pub fn config(&self) -> &Arc<HandlerConfig> {
        &self.cfg
    }

    /// Number of file names currently pending.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether the event passes the handler's admission filters. The
    /// notification transport applies equivalent filters at the source; they
    /// are repeated here because events may arrive from arbitrary senders.
    fn admits(&self, name: &Path, change_size: Option<u64>) -> bool {
        if name
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            tracing::debug!(name = %name.display(), "ignoring path escaping the root");
            return false;
        }

        if self.infra_dirs.iter().any(|dir| name.starts_with(dir)) {
            tracing::debug!(name = %name.display(), "ignoring infrastructure path");
            return false;
        }

        if !self.cfg.recursive && name.components().count() > 1 {
            tracing::debug!(name = %name.display(), "ignoring nested path");
            return false;
        }

        if !self.cfg.include_hidden {
            let hidden = name
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'));
            if hidden {
                tracing::debug!(name = %name.display(), "ignoring hidden file");
                return false;
            }
        }

        if let Some(size) = change_size {
            if self.cfg.min_size_bytes > 0 && size < self.cfg.min_size_bytes {
                tracing::debug!(name = %name.display(), size, "file below minimum size");
                return false;
            }
            if self.cfg.max_size_bytes > 0 && size > self.cfg.max_size_bytes {
                tracing::debug!(name = %name.display(), size, "file above maximum size");
                return false;
            }
        }

        true
    }

    /// Dispatch one change event: deduplicate by cleaned name and enqueue a
    /// task unless one is already pending.
    pub async fn handle(
        self: Arc<Self>,
        scheduler: &Scheduler<C>,
        event: &ChangeEvent,
    ) -> Result<(), HandlerError> {
        match waryio::same_file(&event.root_dir, &self.cfg.path) {
            Ok(true) => {}
            Ok(false) => return Err(HandlerError::RootMismatch),
            Err(e) => return Err(e.into()),
        }

        let name = relpath::clean(&event.change.name);

        if !self.admits(&name, event.change.size) {
            return Ok(());
        }

        let mut pending = self.pending.lock().await;

        if pending.contains(&name) {
            tracing::debug!(
                handler = %self.cfg.name,
                name = %name.display(),
                "file already in queue"
            );
            return Ok(());
        }

        pending.insert(name.clone());

        let handler = Arc::clone(&self);
        let task = Arc::new(Mutex::new(HandlerTask::new(
            Arc::clone(&self.cfg),
            Arc::clone(&self.journal),
            name,
        )));

        scheduler.add(Box::new(move |cancel| {
            let handler = Arc::clone(&handler);
            let task = Arc::clone(&task);
            Box::pin(async move { handler.invoke_task(cancel, task).await })
        }));

        Ok(())
    }

    async fn invoke_task(
        self: Arc<Self>,
        cancel: CancellationToken,
        task: Arc<Mutex<HandlerTask<C>>>,
    ) -> Outcome {
        let mut gate = PendingGuard::new(Arc::clone(&self.pending));

        let mut task = task.lock().await;
        let outcome = task.run(&cancel, &mut gate).await;

        if outcome.is_resolved() {
            gate.acquire().await;
            if let Some(pending) = gate.locked() {
                pending.remove(task.name());
            }
        }

        outcome
    }

    /// Prune the handler's journal and archive directories. Holds the
    /// pending lock so archive decisions never race with removal.
    pub async fn prune(&self, cancel: &CancellationToken) -> Result<(), crate::journal::JournalError> {
        let _pending = self.pending.lock().await;
        self.journal.prune(cancel)
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
