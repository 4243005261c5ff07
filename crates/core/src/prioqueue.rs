// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Indexed min-heap with a caller-supplied ordering
//!
//! Unlike `std::collections::BinaryHeap` this queue hands out handles so that
//! individual entries can be re-sifted or removed after their ordering key
//! changed. The scheduler keeps two of these, one ordered by sequence number
//! and one by due time.

use std::collections::HashMap;
use thiserror::Error;

/// Comparator deciding whether the first value sorts before the second.
pub type LessFn<T> = Box<dyn Fn(&T, &T) -> bool + Send>;

/// Reference to an enqueued value. Popping or removing the value invalidates
/// the handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("handle does not refer to a queued value")]
pub struct StaleHandle;

struct Slot<T> {
    key: u64,
    value: T,
}

/// Min-heap queue sorted by the supplied comparator.
pub struct PrioQueue<T> {
    less: LessFn<T>,
    heap: Vec<Slot<T>>,
    // key -> current position in the heap, kept in sync across sift swaps
    index: HashMap<u64, usize>,
    next_key: u64,
}

impl<T> PrioQueue<T> {
    pub fn new(less: LessFn<T>) -> Self {
        Self {
            less,
            heap: Vec::new(),
            index: HashMap::new(),
            next_key: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Insert a new value, returning a handle suitable for updating or
    /// removing the value directly.
    pub fn push(&mut self, value: T) -> Handle {
        let key = self.next_key;
        self.next_key += 1;

        let pos = self.heap.len();
        self.heap.push(Slot { key, value });
        self.index.insert(key, pos);
        self.sift_up(pos);

        Handle(key)
    }

    /// Remove and return the minimum value.
    pub fn pop(&mut self) -> Option<T> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);

        let slot = self.heap.pop()?;
        self.index.remove(&slot.key);

        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        Some(slot.value)
    }

    /// The minimum value without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.heap.first().map(|s| &s.value)
    }

    /// Remove all values. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }

    pub fn get(&self, handle: &Handle) -> Option<&T> {
        let pos = *self.index.get(&handle.0)?;
        Some(&self.heap[pos].value)
    }

    pub fn get_mut(&mut self, handle: &Handle) -> Option<&mut T> {
        let pos = *self.index.get(&handle.0)?;
        Some(&mut self.heap[pos].value)
    }

    /// Correct the value's position after its ordering key has been mutated.
    pub fn update(&mut self, handle: &Handle) -> Result<(), StaleHandle> {
        let pos = *self.index.get(&handle.0).ok_or(StaleHandle)?;
        let pos = self.sift_up(pos);
        self.sift_down(pos);
        Ok(())
    }

    /// Remove the value regardless of its current position.
    pub fn remove(&mut self, handle: Handle) -> Result<T, StaleHandle> {
        let pos = self.index.remove(&handle.0).ok_or(StaleHandle)?;
        let last = self.heap.len() - 1;

        if pos != last {
            // Re-register the displaced slot before sifting it into place.
            self.heap.swap(pos, last);
            self.index.insert(self.heap[pos].key, pos);
        }

        let slot = match self.heap.pop() {
            Some(slot) => slot,
            None => return Err(StaleHandle),
        };

        if pos < self.heap.len() {
            let pos = self.sift_up(pos);
            self.sift_down(pos);
        }

        Ok(slot.value)
    }

    fn less_at(&self, i: usize, j: usize) -> bool {
        (self.less)(&self.heap[i].value, &self.heap[j].value)
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }

        self.heap.swap(i, j);
        self.index.insert(self.heap[i].key, i);
        self.index.insert(self.heap[j].key, j);
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less_at(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) -> usize {
        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }

            let mut child = left;
            let right = left + 1;
            if right < self.heap.len() && self.less_at(right, left) {
                child = right;
            }

            if !self.less_at(child, pos) {
                break;
            }

            self.swap(pos, child);
            pos = child;
        }
        pos
    }
}

impl<T> std::fmt::Debug for PrioQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrioQueue")
            .field("len", &self.heap.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "prioqueue_tests.rs"]
mod tests;
