//! # Flow watcher task: channel-fed, every value triggers.
//!
//! One task per flow watcher. The task receives from the source channel
//! until it closes or the watcher token cancels. Every received value is
//! stored as `last_value` and enqueued as a reactive signal; there is no
//! change comparison on the flow path: the producer already decided the
//! value was worth sending.

use std::sync::Arc;

use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::logs::{Logger, WatchErrorEntry};
use crate::reactive::value::Value;
use crate::reactive::watcher::WatcherRecord;
use crate::signals::{Signal, SignalKind, SignalQueue};

pub(crate) async fn run_flow(
    record: Arc<WatcherRecord>,
    mut source: mpsc::Receiver<Value>,
    queue: Arc<SignalQueue>,
    logger: Arc<Logger>,
    cancel: CancellationToken,
) {
    loop {
        select! {
            _ = cancel.cancelled() => break,
            received = source.recv() => {
                let Some(value) = received else { break };
                record.store(value);
                let signal = Signal::new(SignalKind::ReactiveChange {
                    watcher: record.name().to_string(),
                });
                if let Err(e) = queue.try_enqueue(signal) {
                    logger.watch_error.push(WatchErrorEntry {
                        watcher: record.name().to_string(),
                        reason: format!("flow signal dropped: {}", e.as_label()),
                    });
                }
            }
        }
    }

    record.set_active(false);
}
