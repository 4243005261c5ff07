// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change event routing
//!
//! The router owns every configured handler and the scheduler they share.
//! Incoming change events are validated, looked up by handler name and
//! dispatched. Journal pruning runs as a periodic self-rescheduling task.

use crate::event::ChangeEvent;
use crate::handler::{Handler, HandlerError};
use baamhackl_core::clock::Clock;
use baamhackl_core::errors::{Cancelled, ErrorStack};
use baamhackl_core::fuzz::fuzz;
use baamhackl_core::scheduler::{Outcome, ScheduleOptions, Scheduler};
use baamhackl_core::HandlerConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const PRUNE_FUZZ_FACTOR: f64 = 0.1;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("missing handler name and/or changed file")]
    MissingFields,

    #[error("root directory must be an absolute path: {0}")]
    RootNotAbsolute(String),

    #[error("filename must be a relative path: {0}")]
    NameNotRelative(String),

    #[error("handler {0:?} not found")]
    UnknownHandler(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

struct Inner<C: Clock> {
    handlers: HashMap<String, Arc<Handler<C>>>,
    scheduler: Scheduler<C>,
}

/// Routes change events to handlers and drives periodic pruning.
pub struct Router<C: Clock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Router<C> {
    pub fn new(configs: Vec<HandlerConfig>, clock: C) -> Self {
        let mut handlers = HashMap::new();

        for cfg in configs {
            let name = cfg.name.clone();
            let handler = Arc::new(Handler::new(Arc::new(cfg), clock.clone()));
            handlers.insert(name, handler);
        }

        Self {
            inner: Arc::new(Inner {
                handlers,
                scheduler: Scheduler::with_clock(clock),
            }),
        }
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.inner.scheduler
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<Handler<C>>> {
        self.inner.handlers.get(name)
    }

    /// Start the shared scheduler with the given slot count.
    pub fn start(&self, slots: usize) {
        self.inner.scheduler.set_slots(slots);
        self.inner.scheduler.start();
    }

    /// Stop the scheduler, waiting for running tasks.
    pub async fn stop(&self, deadline: &CancellationToken) -> Result<(), Cancelled> {
        self.inner.scheduler.stop(deadline).await
    }

    /// Validate and dispatch one change event.
    pub async fn file_changed(&self, event: &ChangeEvent) -> Result<(), RouterError> {
        tracing::debug!(?event, "received file change");

        if event.handler_name.is_empty() || event.change.name.as_os_str().is_empty() {
            return Err(RouterError::MissingFields);
        }

        if !event.root_dir.is_absolute() {
            return Err(RouterError::RootNotAbsolute(
                event.root_dir.display().to_string(),
            ));
        }

        if event.change.name.is_absolute() {
            return Err(RouterError::NameNotRelative(
                event.change.name.display().to_string(),
            ));
        }

        let handler = self
            .inner
            .handlers
            .get(&event.handler_name)
            .ok_or_else(|| RouterError::UnknownHandler(event.handler_name.clone()))?;

        Arc::clone(handler)
            .handle(&self.inner.scheduler, event)
            .await?;

        Ok(())
    }

    /// Begin pruning every handler's journal at roughly the given interval.
    /// The first run happens after a tenth of the interval.
    pub fn start_pruning(&self, interval: Duration) {
        schedule_prune(Arc::clone(&self.inner), interval, interval / 10);
    }

    /// Total number of pending file names across all handlers.
    pub async fn pending_total(&self) -> usize {
        let mut total = 0;
        for handler in self.inner.handlers.values() {
            total += handler.pending_len().await;
        }
        total
    }
}

fn schedule_prune<C: Clock>(inner: Arc<Inner<C>>, interval: Duration, after: Duration) {
    let delay = fuzz(after, PRUNE_FUZZ_FACTOR, &mut rand::thread_rng());

    let task_inner = Arc::clone(&inner);
    inner.scheduler.add_with(
        Box::new(move |cancel| {
            let inner = Arc::clone(&task_inner);
            Box::pin(async move {
                let result = prune_all(&inner, &cancel).await;

                schedule_prune(Arc::clone(&inner), interval, interval);

                match result {
                    Ok(()) => Outcome::Success,
                    Err(e) => Outcome::permanent(e),
                }
            })
        }),
        ScheduleOptions::new().next_after(delay),
    );
}

async fn prune_all<C: Clock>(
    inner: &Inner<C>,
    cancel: &CancellationToken,
) -> Result<(), ErrorStack> {
    let mut names: Vec<&String> = inner.handlers.keys().collect();
    names.sort();

    let mut errors = ErrorStack::new();

    for name in names {
        if cancel.is_cancelled() {
            errors.push(Cancelled);
            break;
        }

        if let Some(handler) = inner.handlers.get(name) {
            if let Err(e) = handler.prune(cancel).await {
                tracing::warn!(handler = %name, error = %e, "pruning failed");
                errors.push(e);
            }
        }
    }

    errors.into_result()
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
