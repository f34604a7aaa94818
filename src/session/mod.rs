//! Session state: everything that lives from `run` to a terminal state.
//!
//! [`Session`] bundles the stores the managed function works against
//! (context, memo, watchers), the logger, the observability counters, and
//! the session cancellation token. The supervisor owns it; the managed
//! function reaches it through [`SessionCtx`].

mod context;
mod handle;
mod memo;

pub use context::ContextStore;
pub use handle::SessionCtx;
pub use memo::MemoCache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::logs::{FaultEntry, Logger};
use crate::signals::{Signal, SignalKind, SignalQueue};
use crate::state::Lifecycle;

/// Observability counters.
pub(crate) struct Stats {
    executions: AtomicU64,
    errors: AtomicU64,
    started_at: RwLock<Option<SystemTime>>,
}

impl Stats {
    fn new() -> Self {
        Self {
            executions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: RwLock::new(None),
        }
    }

    pub(crate) fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_started(&self) {
        let mut started = self.started_at.write().expect("stats poisoned");
        if started.is_none() {
            *started = Some(SystemTime::now());
        }
    }

    pub(crate) fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub(crate) fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub(crate) fn uptime(&self) -> Option<Duration> {
        self.started_at
            .read()
            .expect("stats poisoned")
            .and_then(|t| t.elapsed().ok())
    }
}

/// Everything scoped to one session (one `run` until terminal).
pub(crate) struct Session {
    pub(crate) context: ContextStore,
    pub(crate) memo: MemoCache,
    pub(crate) watchers: crate::reactive::WatcherRegistry,
    pub(crate) logger: Arc<Logger>,
    pub(crate) stats: Stats,
    lifecycle: RwLock<Lifecycle>,
    pub(crate) cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(cfg: &Config, queue: Arc<SignalQueue>) -> Arc<Self> {
        let logger = Arc::new(Logger::new(cfg.max_log_entries));
        let cancel = CancellationToken::new();
        Arc::new(Self {
            context: ContextStore::new(cfg.env.clone(), Arc::clone(&logger)),
            memo: MemoCache::new(cfg.max_memo_entries, Arc::clone(&logger)),
            watchers: crate::reactive::WatcherRegistry::new(
                cfg.max_watches,
                queue,
                Arc::clone(&logger),
                &cancel,
            ),
            logger,
            stats: Stats::new(),
            lifecycle: RwLock::new(Lifecycle::NotRun),
            cancel,
        })
    }

    /// Published lifecycle snapshot (for the control surface and message
    /// admission; the loop is the only writer).
    pub(crate) fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().expect("session poisoned")
    }

    pub(crate) fn publish_lifecycle(&self, lifecycle: Lifecycle) {
        *self.lifecycle.write().expect("session poisoned") = lifecycle;
    }

    /// Admits a user message into the queue, rejecting it with a fault entry
    /// once the session is terminal.
    pub(crate) fn submit_message(
        &self,
        queue: &SignalQueue,
        content: String,
    ) -> Result<(), RuntimeError> {
        let lifecycle = self.lifecycle();
        if lifecycle.is_terminal() {
            self.logger.state_fault.push(FaultEntry {
                lifecycle,
                signal: "user_message",
            });
            return Err(RuntimeError::Terminated { lifecycle });
        }
        queue.try_enqueue(Signal::new(SignalKind::UserMessage { content }))
    }
}
