//! Bounded in-memory observability: the ring primitive, typed entries, and
//! the per-instance [`Logger`] bundle.

mod entry;
mod logger;
mod ring;

pub use entry::{ContextChangeEntry, ContextOp, EffectEntry, FaultEntry, ReduceEntry, WatchErrorEntry};
pub use logger::Logger;
pub use ring::{RingLog, Stamped};
