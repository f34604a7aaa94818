//! # Signals: everything the supervisor loop reacts to.
//!
//! A [`Signal`] is one unit of work for the supervisor loop. Signals fall
//! into three priority classes:
//!
//! - **Lifecycle** (highest): state-machine traffic: `InitRun`, external
//!   `Stop`/`Kill`/`Crash` requests, retry timers firing, and the completion
//!   report of a managed invocation (`ManagedDone`).
//! - **User**: messages submitted programmatically or over HTTP.
//! - **Reactive** (lowest): change notifications from poll/flow watchers and
//!   the synthetic retry trigger that re-arms execution after recovery.
//!
//! ## Ordering guarantees
//! Each signal receives a queue-scoped sequence number at enqueue time
//! (monotonically increasing); within a class, dequeue order is FIFO by that
//! sequence. Across classes, strict priority. See
//! [`SignalQueue`](crate::signals::SignalQueue).

use std::time::SystemTime;

use crate::error::ManagedError;

/// Priority class of a signal. Lower discriminant dequeues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Lifecycle traffic. Always wins; never dropped.
    Lifecycle = 0,
    /// User messages.
    User = 1,
    /// Watcher change notifications and retry triggers. Starvation by the
    /// higher classes is accepted and intended.
    Reactive = 2,
}

/// Classified result of one managed-function invocation.
///
/// Produced by the invocation runner from the function's return value (or
/// from an injected timeout/panic) and carried back to the reducer inside
/// [`SignalKind::ManagedDone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Clean return. Resets the consecutive-failure counter.
    Ok,
    /// Graceful stop requested.
    Stop { reason: String },
    /// Abort requested.
    Kill { reason: String },
    /// Crash-class failure (explicit crash, timeout, or panic).
    Crash { reason: String },
    /// Non-fatal failure; logged and counted, execution resumes from Ready.
    Fail { reason: String },
}

impl Outcome {
    /// Classifies an invocation result by error kind.
    ///
    /// Timeouts and panics collapse into the crash class; their original
    /// label is preserved in the reason text.
    pub fn classify(result: &Result<(), ManagedError>) -> Outcome {
        match result {
            Ok(()) => Outcome::Ok,
            Err(ManagedError::Stop { reason }) => Outcome::Stop {
                reason: reason.clone(),
            },
            Err(ManagedError::Kill { reason }) => Outcome::Kill {
                reason: reason.clone(),
            },
            Err(e) if e.is_crash_class() => Outcome::Crash {
                reason: e.to_string(),
            },
            Err(e) => Outcome::Fail {
                reason: e.to_string(),
            },
        }
    }

    /// True for a clean return.
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Stop { .. } => "stop",
            Outcome::Kill { .. } => "kill",
            Outcome::Crash { .. } => "crash",
            Outcome::Fail { .. } => "fail",
        }
    }
}

/// Payload of a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    // === Lifecycle class ===
    /// Start the session: run the managed function for the first time.
    InitRun,
    /// External graceful-stop request (parent cancellation, API).
    Stop,
    /// External abort request.
    Kill,
    /// External crash request; feeds the recovery policy.
    Crash,
    /// A scheduled retry timer fired.
    RecoveryTimeout,
    /// A managed invocation finished with the given classified outcome.
    ManagedDone { outcome: Outcome },

    // === User class ===
    /// A user message.
    UserMessage { content: String },

    // === Reactive class ===
    /// A watcher observed a change (poll) or received a value (flow).
    ReactiveChange { watcher: String },
    /// Synthetic trigger that re-runs the managed function after recovery.
    RetryTrigger,
}

impl SignalKind {
    /// The priority class this signal dequeues in.
    pub fn priority(&self) -> Priority {
        match self {
            SignalKind::InitRun
            | SignalKind::Stop
            | SignalKind::Kill
            | SignalKind::Crash
            | SignalKind::RecoveryTimeout
            | SignalKind::ManagedDone { .. } => Priority::Lifecycle,
            SignalKind::UserMessage { .. } => Priority::User,
            SignalKind::ReactiveChange { .. } | SignalKind::RetryTrigger => Priority::Reactive,
        }
    }

    /// Returns a short stable label (reduce/fault logs).
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalKind::InitRun => "init_run",
            SignalKind::Stop => "stop",
            SignalKind::Kill => "kill",
            SignalKind::Crash => "crash",
            SignalKind::RecoveryTimeout => "recovery_timeout",
            SignalKind::ManagedDone { outcome } => match outcome {
                Outcome::Ok => "managed_done_ok",
                Outcome::Stop { .. } => "managed_done_stop",
                Outcome::Kill { .. } => "managed_done_kill",
                Outcome::Crash { .. } => "managed_done_crash",
                Outcome::Fail { .. } => "managed_done_fail",
            },
            SignalKind::UserMessage { .. } => "user_message",
            SignalKind::ReactiveChange { .. } => "reactive_change",
            SignalKind::RetryTrigger => "retry_trigger",
        }
    }
}

/// One unit of work for the supervisor loop.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Queue-scoped sequence number, assigned at enqueue time.
    pub seq: u64,
    /// Wall-clock stamp at construction (logging only).
    pub at: SystemTime,
    /// The payload.
    pub kind: SignalKind,
}

impl Signal {
    /// Creates a signal of the given kind. The sequence number is assigned
    /// by the queue on enqueue.
    pub fn new(kind: SignalKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
        }
    }

    /// The priority class this signal dequeues in.
    pub fn priority(&self) -> Priority {
        self.kind.priority()
    }
}
