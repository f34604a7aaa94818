//! # Watcher records and the per-session registry.
//!
//! A watcher is a reactive source feeding the signal queue: either a **poll**
//! watcher (periodic compute with change gating) or a **flow** watcher
//! (every received value triggers). The registry owns the records; watcher
//! tasks hold only the record, the signal queue, and the logger, never the
//! supervisor.
//!
//! ## Registration rules
//! - Registration is **idempotent by name**: a second call under an existing
//!   name returns the current `last_value` and spawns nothing.
//! - Registrations made while the initialization run is in flight are
//!   **parked**; the `StartWatchers` effect (first transition out of the
//!   init state) spawns them all. Later registrations spawn immediately.
//!   Starting earlier would let reactive signals race the initialization
//!   run.
//! - The registry is bounded by the configured watcher limit; registration
//!   beyond it is rejected and logged.
//! - `close` cancels the watcher token; tasks exit cooperatively and flip
//!   their record's `active` flag off.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, WatchError};
use crate::logs::{Logger, WatchErrorEntry};
use crate::reactive::value::Value;
use crate::reactive::{flow, poll};
use crate::signals::SignalQueue;

/// Per-tick update closure produced by a poll watcher's compute factory.
///
/// Receives the previous observed value (absent before the first success)
/// and returns the next value plus the change verdict. Must be
/// side-effect-free; all I/O belongs in the factory.
pub type UpdateFn = Box<dyn FnOnce(Option<&Value>) -> Result<(Value, bool), WatchError> + Send>;

/// Boxed future returned by [`Compute::produce`].
pub type BoxComputeFuture = Pin<Box<dyn Future<Output = UpdateFn> + Send + 'static>>;

/// Compute factory for poll watchers.
///
/// Called once per tick; may perform I/O (fetch, query, read) and captures
/// the result into the returned [`UpdateFn`], which then performs the
/// deterministic change comparison against the previous value.
pub trait Compute: Send + Sync + 'static {
    /// Produces the update closure for one tick.
    fn produce(&self) -> BoxComputeFuture;
}

impl<G, Fut> Compute for G
where
    G: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UpdateFn> + Send + 'static,
{
    fn produce(&self) -> BoxComputeFuture {
        Box::pin((self)())
    }
}

/// What kind of reactive source a watcher is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherKind {
    /// Periodic compute with change gating.
    Poll {
        /// Tick period.
        tick: Duration,
    },
    /// Channel-fed; every received value triggers.
    Flow,
}

impl WatcherKind {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            WatcherKind::Poll { .. } => "poll",
            WatcherKind::Flow => "flow",
        }
    }
}

/// One registered reactive source.
#[derive(Debug)]
pub struct WatcherRecord {
    name: String,
    kind: WatcherKind,
    last_value: RwLock<Option<Value>>,
    active: AtomicBool,
}

impl WatcherRecord {
    fn new(name: String, kind: WatcherKind) -> Self {
        Self {
            name,
            kind,
            last_value: RwLock::new(None),
            active: AtomicBool::new(false),
        }
    }

    /// Watcher name (unique within the session).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll or flow.
    pub fn kind(&self) -> WatcherKind {
        self.kind
    }

    /// Latest observed value; absent until the first successful
    /// compute/receive. The value is stored **before** the reactive signal
    /// is enqueued, so a triggered execution always sees it.
    pub fn last_value(&self) -> Option<Value> {
        self.last_value
            .read()
            .expect("watcher record poisoned")
            .clone()
    }

    /// True while the owning task runs.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn store(&self, value: Value) {
        *self.last_value.write().expect("watcher record poisoned") = Some(value);
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

/// A registration made before the watcher gate opened.
enum Parked {
    Poll {
        record: Arc<WatcherRecord>,
        compute: Arc<dyn Compute>,
        tick: Duration,
    },
    Flow {
        record: Arc<WatcherRecord>,
        source: mpsc::Receiver<Value>,
    },
}

/// Per-session registry of reactive sources.
pub struct WatcherRegistry {
    records: DashMap<String, Arc<WatcherRecord>>,
    parked: Mutex<Vec<Parked>>,
    gate_open: AtomicBool,
    limit: usize,
    queue: Arc<SignalQueue>,
    logger: Arc<Logger>,
    cancel: CancellationToken,
    /// Serializes registrations; lookups stay lock-free on the map.
    registration: Mutex<()>,
}

impl WatcherRegistry {
    /// Creates a registry whose watcher tasks stop with `session` (via a
    /// child token, so `close` does not tear down the session).
    pub(crate) fn new(
        limit: usize,
        queue: Arc<SignalQueue>,
        logger: Arc<Logger>,
        session: &CancellationToken,
    ) -> Self {
        Self {
            records: DashMap::new(),
            parked: Mutex::new(Vec::new()),
            gate_open: AtomicBool::new(false),
            limit,
            queue,
            logger,
            cancel: session.child_token(),
            registration: Mutex::new(()),
        }
    }

    /// Idempotent poll registration. Returns the current value for an
    /// existing name; otherwise registers and returns `None` for this call.
    pub fn register_poll(
        &self,
        name: &str,
        compute: Arc<dyn Compute>,
        tick: Duration,
    ) -> Result<Option<Value>, RuntimeError> {
        let _guard = self.registration.lock().expect("watcher registry poisoned");

        if let Some(existing) = self.records.get(name) {
            return Ok(existing.last_value());
        }
        self.check_limit(name)?;

        let record = Arc::new(WatcherRecord::new(
            name.to_string(),
            WatcherKind::Poll { tick },
        ));
        self.records.insert(name.to_string(), Arc::clone(&record));

        if self.gate_open.load(Ordering::Acquire) {
            self.spawn_poll(record, compute, tick);
        } else {
            self.parked
                .lock()
                .expect("watcher registry poisoned")
                .push(Parked::Poll {
                    record,
                    compute,
                    tick,
                });
        }
        Ok(None)
    }

    /// Idempotent flow registration. For an existing name the new `source`
    /// is dropped and the current value returned.
    pub fn register_flow(
        &self,
        name: &str,
        source: mpsc::Receiver<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        let _guard = self.registration.lock().expect("watcher registry poisoned");

        if let Some(existing) = self.records.get(name) {
            return Ok(existing.last_value());
        }
        self.check_limit(name)?;

        let record = Arc::new(WatcherRecord::new(name.to_string(), WatcherKind::Flow));
        self.records.insert(name.to_string(), Arc::clone(&record));

        if self.gate_open.load(Ordering::Acquire) {
            self.spawn_flow(record, source);
        } else {
            self.parked
                .lock()
                .expect("watcher registry poisoned")
                .push(Parked::Flow { record, source });
        }
        Ok(None)
    }

    /// Looks up the current value of a registered watcher.
    pub fn last_value(&self, name: &str) -> Option<Value> {
        self.records.get(name).and_then(|r| r.last_value())
    }

    /// Opens the gate and spawns every parked watcher. Idempotent.
    ///
    /// Serialized with registrations so nothing can park after the drain.
    pub(crate) fn start_parked(&self) {
        let _guard = self.registration.lock().expect("watcher registry poisoned");
        self.gate_open.store(true, Ordering::Release);
        let parked: Vec<Parked> = {
            let mut guard = self.parked.lock().expect("watcher registry poisoned");
            guard.drain(..).collect()
        };
        for entry in parked {
            match entry {
                Parked::Poll {
                    record,
                    compute,
                    tick,
                } => self.spawn_poll(record, compute, tick),
                Parked::Flow { record, source } => self.spawn_flow(record, source),
            }
        }
    }

    /// Cancels all watcher tasks (cooperative). Idempotent.
    pub(crate) fn close(&self) {
        let _guard = self.registration.lock().expect("watcher registry poisoned");
        self.cancel.cancel();
        // Anything still parked will never spawn.
        self.parked
            .lock()
            .expect("watcher registry poisoned")
            .clear();
    }

    /// Number of registered watchers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot for the control surface: name, kind label, last value,
    /// active flag.
    pub fn snapshot(&self) -> Vec<(String, &'static str, Option<Value>, bool)> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .map(|entry| {
                let r = entry.value();
                (
                    r.name().to_string(),
                    r.kind().as_label(),
                    r.last_value(),
                    r.is_active(),
                )
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    fn check_limit(&self, name: &str) -> Result<(), RuntimeError> {
        if self.records.len() >= self.limit {
            self.logger.watch_error.push(WatchErrorEntry {
                watcher: name.to_string(),
                reason: format!("watcher limit reached ({})", self.limit),
            });
            return Err(RuntimeError::WatchLimit { limit: self.limit });
        }
        Ok(())
    }

    fn spawn_poll(&self, record: Arc<WatcherRecord>, compute: Arc<dyn Compute>, tick: Duration) {
        record.set_active(true);
        tokio::spawn(poll::run_poll(
            record,
            compute,
            tick,
            Arc::clone(&self.queue),
            Arc::clone(&self.logger),
            self.cancel.clone(),
        ));
    }

    fn spawn_flow(&self, record: Arc<WatcherRecord>, source: mpsc::Receiver<Value>) {
        record.set_active(true);
        tokio::spawn(flow::run_flow(
            record,
            source,
            Arc::clone(&self.queue),
            Arc::clone(&self.logger),
            self.cancel.clone(),
        ));
    }
}
