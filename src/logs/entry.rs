//! Typed payloads for the five observability buffers.

use std::time::Duration;

use crate::state::Lifecycle;

/// One reduction: which signal moved the machine from where to where.
#[derive(Debug, Clone)]
pub struct ReduceEntry {
    /// Lifecycle before the signal.
    pub from: Lifecycle,
    /// Lifecycle after the signal.
    pub to: Lifecycle,
    /// Signal label (see `SignalKind::as_label`).
    pub signal: &'static str,
}

/// One managed-invocation completion (plus cleanup outcomes).
#[derive(Debug, Clone)]
pub struct EffectEntry {
    /// Wall time the invocation took.
    pub duration: Duration,
    /// The user message that triggered the run, if any.
    pub message: Option<String>,
    /// The watcher that triggered the run, if any.
    pub watcher: Option<String>,
    /// Outcome label (`ok`, `stop`, `kill`, `crash`, `fail`, `cleanup_error`).
    pub outcome: &'static str,
    /// Error text for non-ok outcomes.
    pub error: Option<String>,
}

/// A poll watcher's compute failure. Never affects supervisor state.
#[derive(Debug, Clone)]
pub struct WatchErrorEntry {
    /// Watcher name.
    pub watcher: String,
    /// Failure description.
    pub reason: String,
}

/// Kind of session-store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOp {
    /// `set_value` assignment.
    Set,
    /// `update_value` read-modify-write.
    Update,
    /// A memo insert rejected at capacity (warning).
    MemoRejected,
}

impl ContextOp {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContextOp::Set => "set",
            ContextOp::Update => "update",
            ContextOp::MemoRejected => "memo_rejected",
        }
    }
}

/// One session-store mutation.
#[derive(Debug, Clone)]
pub struct ContextChangeEntry {
    /// The key that changed.
    pub key: String,
    /// What kind of mutation.
    pub op: ContextOp,
}

/// A signal rejected by the state machine.
#[derive(Debug, Clone)]
pub struct FaultEntry {
    /// Lifecycle at the time of rejection.
    pub lifecycle: Lifecycle,
    /// Label of the rejected signal.
    pub signal: &'static str,
}
