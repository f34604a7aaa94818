//! # Effects: what the reducer asks the runtime to do.
//!
//! The reducer never performs I/O; it returns [`Effect`] records that the
//! effect handler executes in order. Effects are the only way state
//! transitions reach the outside world (spawning invocations, arming timers,
//! starting/stopping watchers).

use std::time::Duration;

/// A request from the reducer to the effect handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Spawn one managed-function invocation.
    RunManaged {
        /// The user message that triggered this run, if any.
        message: Option<String>,
        /// The watcher whose change triggered this run, if any.
        watcher: Option<String>,
        /// True only for the initialization run.
        first: bool,
    },

    /// Invoke the registered cleanup function. The handler guarantees
    /// at-most-once execution per session regardless of how often this
    /// effect is emitted.
    RunCleanup,

    /// After `delay`, enqueue a lifecycle `RecoveryTimeout`.
    ScheduleRetry { delay: Duration },

    /// Spawn the watcher tasks parked during initialization. Idempotent.
    StartWatchers,

    /// Cancel all watcher tasks. Idempotent.
    CloseWatchers,

    /// Enqueue a synthetic reactive trigger so the next `Ready` dequeue
    /// re-runs the managed function.
    EmitRetryTrigger,
}

impl Effect {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Effect::RunManaged { .. } => "run_managed",
            Effect::RunCleanup => "run_cleanup",
            Effect::ScheduleRetry { .. } => "schedule_retry",
            Effect::StartWatchers => "start_watchers",
            Effect::CloseWatchers => "close_watchers",
            Effect::EmitRetryTrigger => "emit_retry_trigger",
        }
    }
}
