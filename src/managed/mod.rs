//! The user-facing work surface: the managed function and the cleanup hook.

mod cleanup;
#[allow(clippy::module_inception)]
mod managed;
mod managed_fn;

pub use cleanup::{Cleanup, CleanupFn, CleanupRef};
pub use managed::{BoxManagedFuture, Managed, ManagedRef};
pub use managed_fn::ManagedFn;
