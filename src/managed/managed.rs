//! # The managed function: the single user-supplied entry point.
//!
//! Defines the core [`Managed`] trait for the async unit of work the
//! supervisor re-invokes on every trigger.
//!
//! - **[`Managed`]** — trait for implementing the managed function
//! - **[`ManagedRef`]** — shared handle (`Arc<dyn Managed>`) for the runtime
//! - **[`BoxManagedFuture`]** — type alias for boxed invocation futures
//!
//! ## Rules
//! - Each invocation receives a fresh [`SessionCtx`]: the API surface for
//!   messages, env, context values, watchers, and memoization.
//! - The crate provides [`ManagedFn`](crate::ManagedFn), a function-backed
//!   implementation wrapping closures.
//! - Invocations run under the configured timeout; implementations should
//!   check [`SessionCtx::is_cancelled`] in long loops and return promptly
//!   once cancelled.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::error::ManagedError;
use crate::session::SessionCtx;

/// Boxed future returned by [`Managed::run`].
pub type BoxManagedFuture =
    Pin<Box<dyn Future<Output = Result<(), ManagedError>> + Send + 'static>>;

/// Shared handle to the managed function.
pub type ManagedRef = Arc<dyn Managed>;

/// Asynchronous, re-invocable, cancelable unit of work.
///
/// The supervisor calls [`Managed::run`] once per trigger (init, user
/// message, reactive change, retry). Invocations never overlap; state that
/// must survive between runs belongs in the session context, not in the
/// implementor.
///
/// Returning an error is how the function steers the lifecycle:
/// [`ManagedError::stop`] for a graceful stop, [`ManagedError::kill`] for an
/// abort, [`ManagedError::crash`] for crash-with-recovery, and
/// [`ManagedError::fail`] for a non-fatal failure that leaves the supervisor
/// operational.
pub trait Managed: Send + Sync + 'static {
    /// Creates a new future executing one invocation.
    ///
    /// ### Rules
    /// - `&self`, not `&mut self`: each call returns an independent future.
    /// - The future **must** observe `ctx` cancellation to honor timeouts
    ///   and shutdown.
    fn run(&self, ctx: SessionCtx) -> BoxManagedFuture;
}
