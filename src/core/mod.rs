//! Runtime core: the supervisor loop and its collaborators.
//!
//! The only public API re-exported from here is [`Supervisor`]. Everything
//! else is an internal building block the supervisor wires together.
//!
//! ## Files & responsibilities
//! - **supervisor.rs**: public facade; owns the queue, session, and effect
//!   handler; drives the dispatch loop (dequeue → reduce → log → effects)
//!   and the terminal drain; maps OS termination signals to a graceful
//!   `Stop` in the queue.
//! - **handler.rs**: executes reducer effects: spawns managed invocations,
//!   arms (jittered) retry timers, opens/closes the watcher gate, guards
//!   cleanup to at-most-once.
//! - **runner.rs**: one managed invocation: timeout, panic capture,
//!   outcome classification, effect-log entry, `ManagedDone` enqueue.
//!
//! ## Signal data-plane (who produces & who consumes)
//!
//! Producers (enqueue to [`SignalQueue`](crate::signals::SignalQueue)):
//! - **Supervisor** → `InitRun` (at start), `Stop` (parent cancellation or
//!   OS signal)
//! - **API / HTTP** → `UserMessage`
//! - **Runner**     → `ManagedDone{outcome}`
//! - **Handler**    → `RecoveryTimeout` (timers), `RetryTrigger`
//! - **Watchers**   → `ReactiveChange{watcher}`
//!
//! Consumer: the one supervisor loop. While an execution is in flight (or
//! recovery is pending) it dequeues lifecycle traffic only, which parks user
//! and reactive signals in FIFO order; single-flight execution and message
//! ordering fall out of the same mechanism.
//!
//! ## Teardown timeline
//! ```text
//! terminal transition → run cleanup (stop/crash only) → close watchers
//! → drain queue (fault entries) → cancel session token → close queue
//! ```

mod handler;
mod runner;
mod supervisor;

pub use supervisor::Supervisor;
