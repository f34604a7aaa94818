//! # The logger: five independent bounded ring buffers.
//!
//! One [`Logger`] per supervisor instance; no process-wide logging state.
//! Each buffer caps at the configured entry limit and drops its oldest
//! entries on overflow, so a long-lived session keeps a sliding window of
//! recent history. Ids are scoped per buffer.
//!
//! | Buffer | Fed by | Contents |
//! |--------|--------|----------|
//! | `reduce` | supervisor loop | every processed signal (from → to) |
//! | `effect` | invocation runner | every managed completion (+ cleanup errors) |
//! | `watch_error` | poll watcher tasks | compute failures |
//! | `context_change` | session store | every set/update (+ memo rejections) |
//! | `state_fault` | supervisor loop | every rejected transition |

use crate::logs::entry::{
    ContextChangeEntry, EffectEntry, FaultEntry, ReduceEntry, WatchErrorEntry,
};
use crate::logs::ring::RingLog;

/// Per-instance bundle of the five observability buffers.
pub struct Logger {
    /// One entry per signal processed.
    pub reduce: RingLog<ReduceEntry>,
    /// One entry per managed-invocation completion.
    pub effect: RingLog<EffectEntry>,
    /// Poll-watcher compute failures.
    pub watch_error: RingLog<WatchErrorEntry>,
    /// Session-store mutations.
    pub context_change: RingLog<ContextChangeEntry>,
    /// Rejected state transitions.
    pub state_fault: RingLog<FaultEntry>,
}

impl Logger {
    /// Creates the five buffers, each capped at `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            reduce: RingLog::new(max_entries),
            effect: RingLog::new(max_entries),
            watch_error: RingLog::new(max_entries),
            context_change: RingLog::new(max_entries),
            state_fault: RingLog::new(max_entries),
        }
    }
}
