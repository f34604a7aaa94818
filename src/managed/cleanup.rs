//! # Cleanup hook invoked on graceful termination.
//!
//! The supervisor runs the registered [`Cleanup`] at most once per session:
//! on a graceful stop and on crash handling, never on the kill (abort) path.
//! Cleanup errors are logged and otherwise ignored; the session is already
//! on its way out.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ManagedError;

/// Shared handle to a cleanup hook.
pub type CleanupRef = Arc<dyn Cleanup>;

/// Contract for the session cleanup hook.
#[async_trait]
pub trait Cleanup: Send + Sync + 'static {
    /// Releases whatever the managed function acquired.
    ///
    /// Errors are recorded in the effect log and do not change state.
    async fn cleanup(&self) -> Result<(), ManagedError>;
}

/// Function-backed cleanup hook.
pub struct CleanupFn<F> {
    f: F,
}

impl<F> CleanupFn<F> {
    /// Creates a new function-backed cleanup hook.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the hook as a shared handle (`Arc<dyn Cleanup>`).
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Cleanup for CleanupFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ManagedError>> + Send + 'static,
{
    async fn cleanup(&self) -> Result<(), ManagedError> {
        (self.f)().await
    }
}
