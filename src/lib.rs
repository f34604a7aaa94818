//! # watchvisor
//!
//! **Watchvisor** is a reactive managed-execution supervisor: a
//! single-process runtime that repeatedly invokes one user-supplied
//! *managed function* in response to external triggers (user messages,
//! polled value changes, flow/stream values) while enforcing a
//! deterministic state machine, crash recovery with backoff, and
//! priority-ordered signal processing.
//!
//! ## Features
//!
//! | Area | Description | Key types / traits |
//! |------|-------------|--------------------|
//! | **Supervision** | Deterministic lifecycle machine with a pure reducer. | [`Supervisor`], [`Lifecycle`] |
//! | **Signals** | Bounded three-class priority queue (lifecycle > user > reactive). | [`Signal`], [`SignalKind`], [`Priority`] |
//! | **Reactivity** | Poll watchers (change-gated) and flow watchers feeding re-execution. | [`SessionCtx::watch_call`], [`SessionCtx::watch_flow`] |
//! | **Session state** | Persistent context with atomic deep-copy updates, load-or-store memo. | [`SessionCtx`], [`Value`] |
//! | **Recovery** | Lightweight retries, exponential backoff, permanent crash. | [`RecoveryPolicy`], [`JitterPolicy`] |
//! | **Errors** | Typed lifecycle-control errors, classified by kind. | [`ManagedError`], [`RuntimeError`] |
//! | **Observability** | Five bounded ring logs + HTTP control surface. | [`Logger`], [`ControlServer`] |
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use watchvisor::{Config, ManagedError, ManagedFn, SessionCtx, Supervisor, UpdateFn, Value};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
//!         // React to whatever triggered this run.
//!         if let Some(msg) = ctx.message() {
//!             println!("message: {msg}");
//!         }
//!
//!         // Register a poll watcher once; later calls just read it.
//!         ctx.watch_call(
//!             || async {
//!                 let sampled = Value::Int(42); // fetch something real here
//!                 Box::new(move |prev: Option<&Value>| {
//!                     let changed = prev != Some(&sampled);
//!                     Ok((sampled, changed))
//!                 }) as UpdateFn
//!             },
//!             "answer",
//!             Duration::from_secs(10),
//!         )?;
//!         Ok::<_, ManagedError>(())
//!     });
//!
//!     let sup = Supervisor::new(Config::default(), managed);
//!     sup.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod logs;
mod managed;
mod policies;
mod reactive;
mod server;
mod session;
mod signals;
mod state;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::Supervisor;
pub use error::{ManagedError, RuntimeError, WatchError};
pub use logs::{
    ContextChangeEntry, ContextOp, EffectEntry, FaultEntry, Logger, ReduceEntry, RingLog, Stamped,
    WatchErrorEntry,
};
pub use managed::{BoxManagedFuture, Cleanup, CleanupFn, CleanupRef, Managed, ManagedFn, ManagedRef};
pub use policies::{JitterPolicy, RecoveryDecision, RecoveryPolicy};
pub use reactive::{BoxComputeFuture, Compute, OpaqueValue, UpdateFn, Value, WatcherKind};
pub use server::ControlServer;
pub use session::SessionCtx;
pub use signals::{Outcome, Priority, Signal, SignalKind};
pub use state::{Effect, Lifecycle};
