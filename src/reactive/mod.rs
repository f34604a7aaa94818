//! The reactive subsystem: dynamic values, watcher records, and the poll and
//! flow tasks that feed change signals into the queue.
//!
//! ## Wiring
//! ```text
//! managed function ──watch_call/watch_flow──► WatcherRegistry
//!                                                 │ (parked until first Ready)
//!                                                 ▼
//!                                        poll/flow task per watcher
//!                                                 │ store last_value
//!                                                 ▼
//!                                        SignalQueue (reactive class)
//! ```

mod flow;
mod poll;
mod value;
mod watcher;

pub use value::{OpaqueValue, Value};
pub use watcher::{BoxComputeFuture, Compute, UpdateFn, WatcherKind, WatcherRecord, WatcherRegistry};
