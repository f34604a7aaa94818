//! # Effect handler: executes what the reducer decided.
//!
//! Effects run in the order the reducer emitted them, on the supervisor
//! loop's task. Anything long-lived (a managed invocation, a retry timer)
//! is spawned and reports back through the signal queue; the loop itself
//! never blocks on managed work.
//!
//! ## Rules
//! - `RunManaged` bumps the execution counter and publishes the triggering
//!   message before the invocation task starts, so the context is consistent
//!   the moment the managed function runs.
//! - Cleanup executes **at most once** per session, whatever the reducer
//!   emits; errors from it are logged and ignored.
//! - Retry timers apply the configured jitter here (never in the reducer)
//!   and die with the session token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::select;
use tokio::time::{self, Instant};

use crate::config::Config;
use crate::logs::{EffectEntry, WatchErrorEntry};
use crate::managed::{CleanupRef, ManagedRef};
use crate::session::Session;
use crate::signals::{Signal, SignalKind, SignalQueue};
use crate::state::Effect;

pub(crate) struct EffectHandler {
    cfg: Config,
    queue: Arc<SignalQueue>,
    session: Arc<Session>,
    managed: ManagedRef,
    cleanup: Option<CleanupRef>,
    cleanup_done: AtomicBool,
}

impl EffectHandler {
    pub(crate) fn new(
        cfg: Config,
        queue: Arc<SignalQueue>,
        session: Arc<Session>,
        managed: ManagedRef,
        cleanup: Option<CleanupRef>,
    ) -> Self {
        Self {
            cfg,
            queue,
            session,
            managed,
            cleanup,
            cleanup_done: AtomicBool::new(false),
        }
    }

    /// Executes one effect.
    pub(crate) async fn apply(&self, effect: Effect) {
        match effect {
            Effect::RunManaged {
                message,
                watcher,
                first: _,
            } => self.spawn_managed(message, watcher),
            Effect::RunCleanup => self.run_cleanup_once().await,
            Effect::ScheduleRetry { delay } => self.schedule_retry(delay),
            Effect::StartWatchers => self.session.watchers.start_parked(),
            Effect::CloseWatchers => self.session.watchers.close(),
            Effect::EmitRetryTrigger => {
                if let Err(e) = self.queue.try_enqueue(Signal::new(SignalKind::RetryTrigger)) {
                    self.session.logger.watch_error.push(WatchErrorEntry {
                        watcher: "<retry>".to_string(),
                        reason: format!("retry trigger dropped: {}", e.as_label()),
                    });
                }
            }
        }
    }

    fn spawn_managed(&self, message: Option<String>, watcher: Option<String>) {
        self.session.stats.record_execution();
        self.session.context.set_message(message.clone());

        tokio::spawn(super::runner::run_once(
            Arc::clone(&self.managed),
            Arc::clone(&self.session),
            Arc::clone(&self.queue),
            self.cfg.timeout,
            message,
            watcher,
        ));
    }

    async fn run_cleanup_once(&self) {
        if self.cleanup_done.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(cleanup) = &self.cleanup else { return };

        let started = Instant::now();
        if let Err(e) = cleanup.cleanup().await {
            // Already terminal; record and move on.
            self.session.logger.effect.push(EffectEntry {
                duration: started.elapsed(),
                message: None,
                watcher: None,
                outcome: "cleanup_error",
                error: Some(e.to_string()),
            });
        }
    }

    fn schedule_retry(&self, delay: std::time::Duration) {
        let delay = self.cfg.recovery.jitter.apply(delay);
        let queue = Arc::clone(&self.queue);
        let cancel = self.session.cancel.clone();

        tokio::spawn(async move {
            select! {
                _ = cancel.cancelled() => {}
                _ = time::sleep(delay) => {
                    let _ = queue.try_enqueue(Signal::new(SignalKind::RecoveryTimeout));
                }
            }
        });
    }
}
