//! Signal types and the priority queue feeding the supervisor loop.
//!
//! - [`Signal`] / [`SignalKind`] / [`Priority`]: the three-class event
//!   vocabulary (lifecycle, user, reactive).
//! - [`Outcome`]: the classified result of a managed invocation.
//! - [`SignalQueue`]: bounded, lossless, strict-priority, FIFO-within-class.

mod queue;
mod signal;

pub use queue::SignalQueue;
pub use signal::{Outcome, Priority, Signal, SignalKind};
