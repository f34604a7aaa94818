//! # Function-backed managed implementation (`ManagedFn`)
//!
//! [`ManagedFn`] wraps a closure `F: Fn(SessionCtx) -> Fut`, producing a
//! fresh future per invocation. No hidden mutable state between runs; state
//! that must persist belongs in the session context.
//!
//! ## Example
//! ```rust
//! use watchvisor::{ManagedError, ManagedFn, ManagedRef, SessionCtx};
//!
//! let m: ManagedRef = ManagedFn::arc(|ctx: SessionCtx| async move {
//!     if let Some(msg) = ctx.message() {
//!         println!("triggered by message: {msg}");
//!     }
//!     Ok::<_, ManagedError>(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::error::ManagedError;
use crate::managed::managed::{BoxManagedFuture, Managed};
use crate::session::SessionCtx;

/// Function-backed managed implementation.
///
/// Wraps a closure that *creates* a new future per invocation.
pub struct ManagedFn<F> {
    f: F,
}

impl<F> ManagedFn<F> {
    /// Creates a new function-backed managed function.
    ///
    /// Prefer [`ManagedFn::arc`] when you immediately need a [`ManagedRef`](crate::ManagedRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the managed function as a shared handle (`Arc<dyn Managed>`).
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Managed for ManagedFn<F>
where
    F: Fn(SessionCtx) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), ManagedError>> + Send + 'static,
{
    fn run(&self, ctx: SessionCtx) -> BoxManagedFuture {
        Box::pin((self.f)(ctx))
    }
}
