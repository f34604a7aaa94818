//! # Lifecycle states of a supervisor session.
//!
//! ```text
//! NotRun ──InitRun──► InitRun ──ok──► Ready ◄──────────────┐
//!                        │              │ user/reactive     │ ok / non-fatal err
//!                        │              ▼                   │
//!                        │           Running ───────────────┘
//!                        │              │
//!                        │              ├─ stop ──► Stopped   (terminal)
//!                        │              ├─ kill ──► Killed    (terminal)
//!                        └─ crash ──────┴─ crash ─► WaitRecover ──timeout──► Ready
//!                                                      │
//!                                                      └─ too many ─► Crashed (terminal)
//! ```
//!
//! Terminal states are sticky: nothing leaves `Stopped`, `Killed`, or
//! `Crashed`; signals arriving there only produce fault log entries.

use std::fmt;

/// State of the managed-execution state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not yet started.
    NotRun,
    /// First managed invocation in flight.
    InitRun,
    /// Idle, accepting user and reactive triggers.
    Ready,
    /// One managed invocation in flight.
    Running,
    /// Graceful terminal state (cleanup ran).
    Stopped,
    /// Abort terminal state (cleanup skipped).
    Killed,
    /// Permanent-failure terminal state.
    Crashed,
    /// Crash recovery: waiting for the retry timer.
    WaitRecover,
}

impl Lifecycle {
    /// True for the sticky terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Lifecycle::Stopped | Lifecycle::Killed | Lifecycle::Crashed
        )
    }

    /// True while a managed invocation is in flight.
    pub fn is_executing(&self) -> bool {
        matches!(self, Lifecycle::InitRun | Lifecycle::Running)
    }

    /// Stable name (status endpoint, logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::NotRun => "NotRun",
            Lifecycle::InitRun => "InitRun",
            Lifecycle::Ready => "Ready",
            Lifecycle::Running => "Running",
            Lifecycle::Stopped => "Stopped",
            Lifecycle::Killed => "Killed",
            Lifecycle::Crashed => "Crashed",
            Lifecycle::WaitRecover => "WaitRecover",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
