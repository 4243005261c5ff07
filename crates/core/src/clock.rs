// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{DateTime, Local, TimeDelta};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock providing both monotonic and wall-clock time.
///
/// Monotonic instants drive scheduling decisions; local wall time feeds
/// timestamp-derived file names and prune deadlines.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn now_local(&self) -> DateTime<Local>;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<(Instant, DateTime<Local>)>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), Local::now()))),
        }
    }

    /// Create a fake clock starting at the given wall time.
    pub fn at(wall: DateTime<Local>) -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), wall))),
        }
    }

    /// Advance both the monotonic and the wall clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.0 += duration;
        current.1 += TimeDelta::from_std(duration).unwrap_or(TimeDelta::zero());
    }

    /// Set the wall clock to a specific time.
    pub fn set_local(&self, wall: DateTime<Local>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.1 = wall;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn now_local(&self) -> DateTime<Local> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
