// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Randomized duration fuzzing
//!
//! Retry delays and prune intervals are fuzzed so that independent handlers
//! do not fall into lockstep.

use rand::Rng;
use std::time::Duration;

/// Returns the duration modified by a random amount in the range ±factor/2.
pub fn fuzz<R: Rng + ?Sized>(d: Duration, factor: f64, rng: &mut R) -> Duration {
    if factor <= 0.0 {
        return d;
    }

    let u = rng.gen_range(-factor / 2.0..factor / 2.0);
    Duration::from_secs_f64((d.as_secs_f64() * (1.0 + u)).max(0.0))
}

#[cfg(test)]
#[path = "fuzz_tests.rs"]
mod tests;
