// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot-bounded task scheduler
//!
//! A single dispatcher consumes from two priority queues and launches tasks
//! on separate workers, up to a configurable number of concurrent slots.
//! Tasks without a due time run in insertion order; tasks with one run once
//! it has passed, taking precedence over insertion-ordered tasks. A task
//! returning [`Outcome::Transient`] is re-enqueued keyed by wall-clock due
//! time.

mod task;

pub use task::{Outcome, TaskFn, TaskFuture};

use crate::clock::{Clock, SystemClock};
use crate::errors::Cancelled;
use crate::prioqueue::PrioQueue;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use task::Task;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

/// Options for scheduling one task.
#[derive(Debug, Default, Clone)]
pub struct ScheduleOptions {
    next_after: Option<Duration>,
}

impl ScheduleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the task only after the given amount of wall time has passed.
    pub fn next_after(mut self, delay: Duration) -> Self {
        self.next_after = Some(delay);
        self
    }
}

struct State {
    slots: usize,
    next_seq: u64,

    // Tasks sorted by insertion order.
    by_order: PrioQueue<Task>,

    // Tasks sorted by due time.
    by_time: PrioQueue<Task>,

    active_tasks: usize,
    started: bool,
    loop_running: bool,
    stop_requested: bool,
}

impl State {
    fn queues_empty(&self) -> bool {
        self.by_order.is_empty() && self.by_time.is_empty()
    }
}

struct Shared<C> {
    clock: C,
    state: Mutex<State>,

    // Wakes the dispatcher; it is the only waiter.
    wakeup: Notify,

    // Bumped whenever a task or the dispatcher finishes.
    completions: watch::Sender<()>,

    // Shared context for all task invocations.
    cancel: CancellationToken,
}

impl<C> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cooperative parallel scheduler with a bounded worker pool.
pub struct Scheduler<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        let slots = std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1);

        let (completions, _) = watch::channel(());

        Self {
            shared: Arc::new(Shared {
                clock,
                state: Mutex::new(State {
                    slots,
                    next_seq: 1,
                    by_order: PrioQueue::new(Box::new(|a: &Task, b: &Task| a.seq < b.seq)),
                    by_time: PrioQueue::new(Box::new(|a: &Task, b: &Task| {
                        a.next_after < b.next_after
                    })),
                    active_tasks: 0,
                    started: false,
                    loop_running: false,
                    stop_requested: false,
                }),
                wakeup: Notify::new(),
                completions,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Change the number of tasks running concurrently.
    pub fn set_slots(&self, count: usize) {
        let count = count.max(1);

        self.shared.lock().slots = count;
        self.shared.wakeup.notify_one();
    }

    /// Append a task. Unless configured otherwise tasks are started in the
    /// order they were added.
    pub fn add(&self, fn_: TaskFn) {
        self.add_with(fn_, ScheduleOptions::default());
    }

    pub fn add_with(&self, fn_: TaskFn, opts: ScheduleOptions) {
        let next_after = opts.next_after.map(|d| self.shared.clock.now() + d);

        {
            let mut state = self.shared.lock();
            let seq = state.next_seq;
            state.next_seq += 1;

            enqueue(&mut state, Task::new(fn_, seq, next_after));
        }

        self.shared.wakeup.notify_one();
    }

    /// Number of queued (not yet running) tasks.
    pub fn queue_len(&self) -> usize {
        let state = self.shared.lock();
        state.by_order.len() + state.by_time.len()
    }

    /// Number of currently running tasks.
    pub fn active_tasks(&self) -> usize {
        self.shared.lock().active_tasks
    }

    /// Launch the dispatcher. Must be called from within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called more than once or after [`Scheduler::stop`].
    pub fn start(&self) {
        {
            let mut state = self.shared.lock();
            if state.started || state.stop_requested {
                panic!("scheduler may only start once");
            }
            state.started = true;
            state.loop_running = true;
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(dispatch_loop(shared));
    }

    /// Wait until all tasks have run. Tasks added concurrently extend the
    /// wait. The token bounds the wait without affecting tasks.
    pub async fn quiesce(&self, deadline: &CancellationToken) -> Result<(), Cancelled> {
        self.shared.wakeup.notify_one();

        let mut completions = self.shared.completions.subscribe();

        loop {
            {
                let state = self.shared.lock();
                if state.active_tasks == 0 && state.queues_empty() {
                    return Ok(());
                }
            }

            tokio::select! {
                _ = completions.changed() => {}
                _ = deadline.cancelled() => return Err(Cancelled),
            }
        }
    }

    /// Request dispatcher exit and wait for running tasks. Cancelling the
    /// token gives up on waiting gracefully: the task context is cancelled so
    /// workers observe it, and the wait continues until they finish. Unrun
    /// tasks are abandoned.
    pub async fn stop(&self, deadline: &CancellationToken) -> Result<(), Cancelled> {
        self.shared.lock().stop_requested = true;
        self.shared.wakeup.notify_one();

        let mut completions = self.shared.completions.subscribe();
        let mut result = Ok(());
        let mut deadline_armed = true;

        loop {
            {
                let mut state = self.shared.lock();
                if !state.loop_running && state.active_tasks == 0 {
                    state.by_order.clear();
                    state.by_time.clear();
                    break;
                }
            }

            tokio::select! {
                _ = completions.changed() => {}
                _ = deadline.cancelled(), if deadline_armed => {
                    result = Err(Cancelled);
                    deadline_armed = false;

                    // Make workers observe cancellation.
                    self.shared.cancel.cancel();
                }
            }
        }

        self.shared.cancel.cancel();

        result
    }
}

fn enqueue(state: &mut State, task: Task) {
    debug_assert!(task.seq != 0, "task lacks a sequence number");

    if task.next_after.is_none() {
        state.by_order.push(task);
    } else {
        state.by_time.push(task);
    }
}

enum Dispatch {
    Run(Task),
    Wait(Option<Instant>),
    Stop,
}

fn pop_next(state: &mut State, now: Instant) -> Dispatch {
    if state.stop_requested {
        return Dispatch::Stop;
    }

    if state.active_tasks >= state.slots {
        return Dispatch::Wait(None);
    }

    let mut next_due = None;

    if let Some(due) = state.by_time.peek().and_then(|t| t.next_after) {
        if due <= now {
            if let Some(task) = state.by_time.pop() {
                return Dispatch::Run(task);
            }
        }
        next_due = Some(due);
    }

    if let Some(task) = state.by_order.pop() {
        return Dispatch::Run(task);
    }

    Dispatch::Wait(next_due)
}

async fn dispatch_loop<C: Clock>(shared: Arc<Shared<C>>) {
    loop {
        let next = {
            let mut state = shared.lock();
            let now = shared.clock.now();
            let next = pop_next(&mut state, now);
            if matches!(next, Dispatch::Run(_)) {
                state.active_tasks += 1;
            }
            next
        };

        match next {
            Dispatch::Stop => break,
            Dispatch::Run(task) => {
                let worker_shared = Arc::clone(&shared);
                tokio::spawn(run_task(worker_shared, task));
            }
            Dispatch::Wait(due) => {
                let timer = async {
                    match due {
                        Some(instant) => {
                            tokio::time::sleep_until(tokio::time::Instant::from_std(instant)).await
                        }
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = shared.wakeup.notified() => {}
                    _ = timer => {}
                }
            }
        }
    }

    shared.lock().loop_running = false;
    shared.completions.send_replace(());
}

async fn run_task<C: Clock>(shared: Arc<Shared<C>>, mut task: Task) {
    let outcome = task.run(shared.cancel.clone()).await;

    let queues_nonempty = {
        let mut state = shared.lock();
        state.active_tasks -= 1;

        if let Outcome::Transient { delay, .. } = &outcome {
            task.next_after = Some(shared.clock.now() + *delay);
            enqueue(&mut state, task);
        }

        !state.queues_empty()
    };

    if queues_nonempty {
        shared.wakeup.notify_one();
    }

    shared.completions.send_replace(());
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
