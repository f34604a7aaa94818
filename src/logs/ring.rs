//! # Bounded ring buffer for log entries.
//!
//! [`RingLog`] is the storage primitive behind every observability buffer in
//! the runtime: append-only from the writer's perspective, oldest entries
//! dropped once the cap is reached, never blocking, never failing.
//!
//! ## Rules
//! - Every pushed entry is stamped with a buffer-scoped monotonically
//!   increasing `id` and a wall-clock timestamp.
//! - Readers get clones; the buffer is never exposed by reference.
//! - Pagination is by position in the retained window, not by id (ids of
//!   dropped entries are gone for good).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;

/// A log entry with its buffer-scoped id and timestamp.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    /// Monotonically increasing id, scoped to this buffer.
    pub id: u64,
    /// Wall-clock time of the push.
    pub at: SystemTime,
    /// The payload.
    pub entry: T,
}

struct RingState<T> {
    entries: VecDeque<Stamped<T>>,
    next_id: u64,
}

/// Bounded ring buffer with monotonically increasing entry ids.
pub struct RingLog<T> {
    state: Mutex<RingState<T>>,
    capacity: usize,
}

impl<T> RingLog<T> {
    /// Creates a ring retaining at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                entries: VecDeque::new(),
                next_id: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Appends an entry, dropping the oldest one at capacity. Returns the id.
    pub fn push(&self, entry: T) -> u64 {
        let mut state = self.state.lock().expect("ring log poisoned");
        let id = state.next_id;
        state.next_id += 1;
        if state.entries.len() == self.capacity {
            state.entries.pop_front();
        }
        state.entries.push_back(Stamped {
            id,
            at: SystemTime::now(),
            entry,
        });
        id
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.state.lock().expect("ring log poisoned").entries.len()
    }

    /// True when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> RingLog<T> {
    /// Clones the full retained window, oldest first.
    pub fn snapshot(&self) -> Vec<Stamped<T>> {
        let state = self.state.lock().expect("ring log poisoned");
        state.entries.iter().cloned().collect()
    }

    /// Clones one page of the retained window, oldest first.
    ///
    /// Returns `(total_retained, page)`; `offset` past the end yields an
    /// empty page.
    pub fn page(&self, offset: usize, limit: usize) -> (usize, Vec<Stamped<T>>) {
        let state = self.state.lock().expect("ring log poisoned");
        let total = state.entries.len();
        let page = state
            .entries
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (total, page)
    }
}
