//! # Error types used by the watchvisor runtime and managed functions.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] errors raised by the supervisor runtime itself.
//! - [`ManagedError`] errors returned by (or injected around) the managed function.
//!
//! [`ManagedError`] doubles as the lifecycle-control channel: a managed
//! function requests a graceful stop, an abort, or a crash-with-recovery by
//! returning the corresponding variant. Classification is by variant, never
//! by message text. Both types provide `as_label` for logs.

use std::time::Duration;

use thiserror::Error;

use crate::state::Lifecycle;

/// # Errors produced by the supervisor runtime.
///
/// These represent failures of the orchestration machinery, not of the
/// managed function.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The supervisor is in a terminal state and no longer accepts signals.
    #[error("supervisor is terminal ({lifecycle}); signal rejected")]
    Terminated {
        /// The terminal lifecycle state.
        lifecycle: Lifecycle,
    },

    /// The signal queue is at capacity for this priority class.
    #[error("signal queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The signal queue was closed (session teardown).
    #[error("signal queue closed")]
    QueueClosed,

    /// The memo cache is at capacity; the insert was rejected, never evicted.
    #[error("memo cache full (limit {limit}); insert rejected")]
    MemoCapacity {
        /// Configured memo entry limit.
        limit: usize,
    },

    /// The watcher registry is at capacity; the registration was rejected.
    #[error("watcher limit reached (limit {limit}); registration rejected")]
    WatchLimit {
        /// Configured watcher limit.
        limit: usize,
    },

    /// `run` was invoked on a supervisor whose loop already started.
    #[error("supervisor loop already started")]
    AlreadyStarted,

    /// The control server failed to bind its listen address.
    #[error("control server failed to bind port {port}: {reason}")]
    ServerBind {
        /// Configured listen port.
        port: u16,
        /// Underlying bind error.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Terminated { .. } => "runtime_terminated",
            RuntimeError::QueueFull { .. } => "runtime_queue_full",
            RuntimeError::QueueClosed => "runtime_queue_closed",
            RuntimeError::MemoCapacity { .. } => "runtime_memo_capacity",
            RuntimeError::WatchLimit { .. } => "runtime_watch_limit",
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::ServerBind { .. } => "runtime_server_bind",
        }
    }
}

/// # Errors returned by managed-function executions.
///
/// Four of the variants are constructed by user code to request a lifecycle
/// transition ([`ManagedError::stop`], [`ManagedError::kill`],
/// [`ManagedError::crash`], [`ManagedError::fail`]); [`ManagedError::Timeout`]
/// and [`ManagedError::Panic`] are injected by the invocation runner.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ManagedError {
    /// Graceful stop requested; cleanup runs, supervisor becomes `Stopped`.
    #[error("stop requested: {reason}")]
    Stop { reason: String },

    /// Abort requested; cleanup is skipped, supervisor becomes `Killed`.
    #[error("kill requested: {reason}")]
    Kill { reason: String },

    /// Crash requested; cleanup runs, recovery policy decides what follows.
    #[error("crash requested: {reason}")]
    Crash { reason: String },

    /// Execution exceeded the configured timeout (crash-class).
    #[error("execution timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The managed function panicked; the payload is captured (crash-class).
    #[error("managed function panicked: {reason}")]
    Panic { reason: String },

    /// Any other execution failure. Logged and counted, **non-fatal**: the
    /// supervisor returns to `Ready`.
    #[error("execution failed: {reason}")]
    Fail { reason: String },
}

impl ManagedError {
    /// Requests a graceful stop.
    pub fn stop(reason: impl Into<String>) -> Self {
        ManagedError::Stop {
            reason: reason.into(),
        }
    }

    /// Requests an abort (no cleanup).
    pub fn kill(reason: impl Into<String>) -> Self {
        ManagedError::Kill {
            reason: reason.into(),
        }
    }

    /// Requests a crash with recovery.
    pub fn crash(reason: impl Into<String>) -> Self {
        ManagedError::Crash {
            reason: reason.into(),
        }
    }

    /// Reports a non-fatal execution failure.
    pub fn fail(reason: impl Into<String>) -> Self {
        ManagedError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagedError::Stop { .. } => "managed_stop",
            ManagedError::Kill { .. } => "managed_kill",
            ManagedError::Crash { .. } => "managed_crash",
            ManagedError::Timeout { .. } => "managed_timeout",
            ManagedError::Panic { .. } => "managed_panic",
            ManagedError::Fail { .. } => "managed_fail",
        }
    }

    /// True for the crash class: `Crash`, `Timeout`, and `Panic` all feed the
    /// recovery policy.
    pub fn is_crash_class(&self) -> bool {
        matches!(
            self,
            ManagedError::Crash { .. } | ManagedError::Timeout { .. } | ManagedError::Panic { .. }
        )
    }
}

impl From<RuntimeError> for ManagedError {
    /// Runtime failures surfacing inside a managed function (queue
    /// backpressure, watcher/memo capacity) default to the non-fatal class;
    /// the function escalates explicitly if it wants a lifecycle change.
    fn from(e: RuntimeError) -> Self {
        ManagedError::Fail {
            reason: e.to_string(),
        }
    }
}

/// Error produced by a poll watcher's update closure.
///
/// Watch errors never affect supervisor state; they are recorded in the
/// watch-error log and the tick is skipped.
#[derive(Error, Debug, Clone)]
#[error("watch compute failed: {reason}")]
pub struct WatchError {
    /// Human-readable failure description.
    pub reason: String,
}

impl WatchError {
    /// Creates a watch error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_class_covers_timeout_and_panic() {
        assert!(ManagedError::crash("x").is_crash_class());
        assert!(ManagedError::Timeout {
            timeout: Duration::from_secs(1)
        }
        .is_crash_class());
        assert!(ManagedError::Panic {
            reason: "boom".into()
        }
        .is_crash_class());
        assert!(!ManagedError::stop("x").is_crash_class());
        assert!(!ManagedError::kill("x").is_crash_class());
        assert!(!ManagedError::fail("x").is_crash_class());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(ManagedError::stop("x").as_label(), "managed_stop");
        assert_eq!(
            RuntimeError::QueueFull { capacity: 1 }.as_label(),
            "runtime_queue_full"
        );
    }
}
