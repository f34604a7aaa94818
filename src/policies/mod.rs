//! Retry policies: when to come back after a crash, and how exactly.
//!
//! - [`RecoveryPolicy`] maps consecutive failures to lightweight retries,
//!   exponential backoff, or a permanent crash.
//! - [`JitterPolicy`] optionally randomizes the computed delays at
//!   scheduling time.

mod jitter;
mod recovery;

pub use jitter::JitterPolicy;
pub use recovery::{RecoveryDecision, RecoveryPolicy};
