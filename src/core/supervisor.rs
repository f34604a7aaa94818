//! # Supervisor: the reactive managed-execution runtime.
//!
//! The [`Supervisor`] owns the runtime components (signal queue, session
//! stores, logger, effect handler) and drives the single-threaded dispatch
//! loop that makes the state machine deterministic.
//!
//! ## Architecture
//! ```text
//! send_message() / HTTP ──► SignalQueue (user class)
//! poll/flow watchers ─────► SignalQueue (reactive class)
//! retry timers, ManagedDone, parent cancel ──► SignalQueue (lifecycle class)
//!
//! Supervisor::run()
//!   loop {
//!     ├─► recv next signal   (lifecycle-only while an execution is in
//!     │                       flight or recovery is pending; all classes
//!     │                       in Ready)
//!     ├─► reduce(machine, signal)      (pure)
//!     ├─► append reduce-log entry (+ fault entry on rejection)
//!     ├─► publish lifecycle snapshot
//!     └─► execute effects in order
//!           ├─ RunManaged    → spawn invocation task → ManagedDone
//!           ├─ ScheduleRetry → spawn timer → RecoveryTimeout
//!           ├─ Start/CloseWatchers, EmitRetryTrigger, RunCleanup
//!   } until terminal
//!   drain queue (fault entries), cancel session, close queue
//! ```
//!
//! ## Rules
//! - The loop is the **only writer** to machine state; everything else
//!   talks to it through the queue. This is the invariant the whole design
//!   leans on.
//! - Exactly one managed invocation is in flight at any time; user and
//!   reactive signals stay parked (in FIFO order) until the machine is back
//!   in `Ready`.
//! - Terminal states are sticky; once reached, pending and late signals only
//!   produce state-fault entries.
//! - A cancelled parent token is a graceful `Stop`.
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use watchvisor::{Config, ManagedError, ManagedFn, Supervisor, SessionCtx};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
//!         if let Some(msg) = ctx.message() {
//!             println!("got message: {msg}");
//!         }
//!         Ok::<_, ManagedError>(())
//!     });
//!
//!     let sup = Supervisor::new(Config::default(), managed);
//!     sup.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::handler::EffectHandler;
use crate::error::RuntimeError;
use crate::logs::{FaultEntry, Logger, ReduceEntry};
use crate::managed::{CleanupRef, ManagedRef};
use crate::reactive::Value;
use crate::session::Session;
use crate::signals::{Priority, Signal, SignalKind, SignalQueue};
use crate::state::{reduce, Lifecycle, Machine, Step};

/// Reactive managed-execution supervisor for one managed function.
pub struct Supervisor {
    cfg: Config,
    queue: Arc<SignalQueue>,
    session: Arc<Session>,
    handler: EffectHandler,
    started: AtomicBool,
}

impl Supervisor {
    /// Creates a supervisor around the managed function.
    pub fn new(cfg: Config, managed: ManagedRef) -> Self {
        Self::with_parts(cfg, managed, None)
    }

    /// Creates a supervisor with a cleanup hook (runs once on stop/crash,
    /// never on kill).
    pub fn with_cleanup(cfg: Config, managed: ManagedRef, cleanup: CleanupRef) -> Self {
        Self::with_parts(cfg, managed, Some(cleanup))
    }

    fn with_parts(cfg: Config, managed: ManagedRef, cleanup: Option<CleanupRef>) -> Self {
        let queue = Arc::new(SignalQueue::new(cfg.signal_capacity));
        let session = Session::new(&cfg, Arc::clone(&queue));
        let handler = EffectHandler::new(
            cfg.clone(),
            Arc::clone(&queue),
            Arc::clone(&session),
            managed,
            cleanup,
        );
        Self {
            cfg,
            queue,
            session,
            handler,
            started: AtomicBool::new(false),
        }
    }

    /// Runs the session until a terminal state.
    ///
    /// Cancelling `parent` triggers a graceful `Stop`. Returns the terminal
    /// lifecycle, or [`RuntimeError::AlreadyStarted`] on a second call.
    pub async fn run(&self, parent: CancellationToken) -> Result<Lifecycle, RuntimeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }
        self.session.stats.mark_started();
        self.spawn_parent_watch(parent);

        self.queue.try_enqueue(Signal::new(SignalKind::InitRun))?;

        let mut machine = Machine::new();
        loop {
            let max = if machine.lifecycle == Lifecycle::Ready {
                Priority::Reactive
            } else {
                // In-flight execution, init, recovery wait, or not-yet-run:
                // only lifecycle traffic moves the machine.
                Priority::Lifecycle
            };
            let Some(signal) = self.queue.recv(max).await else {
                break;
            };

            let step = self.reduce_and_log(&machine, &signal);
            machine = step.next;
            self.session.publish_lifecycle(machine.lifecycle);

            for effect in step.effects {
                self.handler.apply(effect).await;
            }

            if machine.lifecycle.is_terminal() {
                self.drain_terminal(&machine);
                break;
            }
        }

        self.session.cancel.cancel();
        self.queue.close();
        Ok(machine.lifecycle)
    }

    /// Runs the session until a terminal state or an OS termination signal
    /// (SIGINT/SIGTERM/SIGQUIT on Unix, Ctrl-C elsewhere), which feeds a
    /// graceful `Stop` through the signal queue like any other lifecycle
    /// request.
    pub async fn run_with_os_signals(&self) -> Result<Lifecycle, RuntimeError> {
        let queue = Arc::clone(&self.queue);
        let session_cancel = self.session.cancel.clone();
        tokio::spawn(async move {
            select! {
                _ = session_cancel.cancelled() => {}
                received = os_termination() => {
                    if received.is_ok() {
                        let _ = queue.try_enqueue(Signal::new(SignalKind::Stop));
                    }
                }
            }
        });
        self.run(CancellationToken::new()).await
    }

    /// Submits a user message.
    ///
    /// Returns [`RuntimeError::Terminated`] (and records a state-fault
    /// entry) once the session is terminal, or
    /// [`RuntimeError::QueueFull`] under backpressure.
    pub fn send_message(&self, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.session.submit_message(&self.queue, content.into())
    }

    // ---- Observability ----

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current lifecycle snapshot.
    pub fn lifecycle(&self) -> Lifecycle {
        self.session.lifecycle()
    }

    /// Number of managed invocations spawned so far.
    pub fn execution_count(&self) -> u64 {
        self.session.stats.executions()
    }

    /// Number of non-ok invocation outcomes so far.
    pub fn error_count(&self) -> u64 {
        self.session.stats.errors()
    }

    /// Time since the loop started, if it has.
    pub fn uptime(&self) -> Option<Duration> {
        self.session.stats.uptime()
    }

    /// The five observability buffers.
    pub fn logs(&self) -> &Logger {
        &self.session.logger
    }

    /// Watcher snapshot: name, kind label, last value, active flag.
    pub fn watching(&self) -> Vec<(String, &'static str, Option<Value>, bool)> {
        self.session.watchers.snapshot()
    }

    /// Settled memo entries.
    pub fn memo_entries(&self) -> Vec<(String, Value)> {
        self.session.memo.snapshot()
    }

    /// Context value snapshot.
    pub fn context_entries(&self) -> Vec<(String, Value)> {
        self.session.context.snapshot()
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub(crate) fn queue(&self) -> &Arc<SignalQueue> {
        &self.queue
    }

    // ---- Loop internals ----

    fn reduce_and_log(&self, machine: &Machine, signal: &Signal) -> Step {
        let step = reduce(machine, signal, &self.cfg.recovery);
        self.session.logger.reduce.push(ReduceEntry {
            from: machine.lifecycle,
            to: step.next.lifecycle,
            signal: signal.kind.as_label(),
        });
        if step.fault {
            self.session.logger.state_fault.push(FaultEntry {
                lifecycle: machine.lifecycle,
                signal: signal.kind.as_label(),
            });
        }
        step
    }

    /// Terminal drain: everything still queued reduces against the sticky
    /// terminal state, producing fault entries.
    fn drain_terminal(&self, machine: &Machine) {
        while let Some(signal) = self.queue.try_recv_any() {
            let _ = self.reduce_and_log(machine, &signal);
        }
    }

    /// Maps parent cancellation to a graceful `Stop`; the watch dies with
    /// the session.
    fn spawn_parent_watch(&self, parent: CancellationToken) {
        let queue = Arc::clone(&self.queue);
        let session_cancel = self.session.cancel.clone();
        tokio::spawn(async move {
            select! {
                _ = session_cancel.cancelled() => {}
                _ = parent.cancelled() => {
                    let _ = queue.try_enqueue(Signal::new(SignalKind::Stop));
                }
            }
        });
    }
}

/// Completes when the process receives a termination signal.
///
/// Errors only if listener registration fails; the caller then runs without
/// OS-signal handling rather than aborting the session.
#[cfg(unix)]
async fn os_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind as Sig};

    let mut interrupt = signal(Sig::interrupt())?;
    let mut terminate = signal(Sig::terminate())?;
    let mut quit = signal(Sig::quit())?;

    select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn os_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
