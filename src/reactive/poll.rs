//! # Poll watcher task: periodic compute with change gating.
//!
//! One task per poll watcher. On each tick:
//!
//! ```text
//! compute.produce().await            (factory; may do I/O)
//!   └─► update(prev)                 (pure comparison half)
//!         ├─ Err  → watch-error log, skip tick
//!         ├─ changed (or first value) → store last_value, enqueue reactive signal
//!         └─ unchanged → nothing
//! ```
//!
//! ## Rules
//! - The first successful compute always counts as changed (bootstrap),
//!   whatever the update closure claimed.
//! - `last_value` is stored **before** the signal is enqueued; a triggered
//!   execution can always read it.
//! - Compute failures never touch supervisor state.
//! - The task exits on watcher-token cancellation and clears `active`.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::logs::{Logger, WatchErrorEntry};
use crate::reactive::watcher::{Compute, WatcherRecord};
use crate::signals::{Signal, SignalKind, SignalQueue};

pub(crate) async fn run_poll(
    record: Arc<WatcherRecord>,
    compute: Arc<dyn Compute>,
    tick: Duration,
    queue: Arc<SignalQueue>,
    logger: Arc<Logger>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(tick.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let update = compute.produce().await;
        let prev = record.last_value();

        match update(prev.as_ref()) {
            Err(e) => {
                logger.watch_error.push(WatchErrorEntry {
                    watcher: record.name().to_string(),
                    reason: e.reason,
                });
            }
            Ok((next, changed)) => {
                if changed || prev.is_none() {
                    record.store(next);
                    let signal = Signal::new(SignalKind::ReactiveChange {
                        watcher: record.name().to_string(),
                    });
                    if let Err(e) = queue.try_enqueue(signal) {
                        logger.watch_error.push(WatchErrorEntry {
                            watcher: record.name().to_string(),
                            reason: format!("change signal dropped: {}", e.as_label()),
                        });
                    }
                }
            }
        }
    }

    record.set_active(false);
}
