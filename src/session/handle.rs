//! # `SessionCtx`: the API surface handed to the managed function.
//!
//! One handle per invocation, cheap to clone. It carries the trigger
//! provenance (message or watcher), the invocation cancellation token, and
//! access to the session stores:
//!
//! | Method | Backed by |
//! |--------|-----------|
//! | `message`, `watcher_id` | trigger provenance of this invocation |
//! | `get_env`, `get_value`, `set_value`, `update_value` | context store |
//! | `watch_call`, `watch_flow` | watcher registry (idempotent) |
//! | `memo`, `clear_memo` | memo cache |
//! | `is_cancelled`, `cancelled` | invocation token (timeout/shutdown) |
//!
//! Watcher registrations made during the initialization run are parked and
//! started once initialization settles (the first transition out of the
//! init state, whatever its outcome); everything else is live immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::reactive::{Compute, Value};
use crate::session::Session;

/// Per-invocation handle to the session.
#[derive(Clone)]
pub struct SessionCtx {
    session: Arc<Session>,
    cancel: CancellationToken,
    message: Option<String>,
    watcher: Option<String>,
}

impl SessionCtx {
    pub(crate) fn new(
        session: Arc<Session>,
        cancel: CancellationToken,
        message: Option<String>,
        watcher: Option<String>,
    ) -> Self {
        Self {
            session,
            cancel,
            message,
            watcher,
        }
    }

    /// The user message that triggered this invocation, if any.
    pub fn message(&self) -> Option<String> {
        self.message.clone()
    }

    /// The watcher whose change triggered this invocation, if any.
    pub fn watcher_id(&self) -> Option<String> {
        self.watcher.clone()
    }

    /// Reads the immutable env map.
    pub fn get_env(&self, key: &str) -> Option<String> {
        self.session.context.get_env(key)
    }

    /// Reads a context value (clone; serialized with writes).
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.session.context.get_value(key)
    }

    /// Assigns a context value.
    pub fn set_value(&self, key: &str, value: Value) {
        self.session.context.set_value(key, value);
    }

    /// Atomic read-modify-write on a context value; the closure sees a deep
    /// copy. Returns the installed value.
    pub fn update_value<F>(&self, key: &str, f: F) -> Value
    where
        F: FnOnce(Option<Value>) -> Value,
    {
        self.session.context.update_value(key, f)
    }

    /// Idempotent poll-watcher registration.
    ///
    /// The first call under `name` registers the watcher and returns `None`;
    /// subsequent calls are cheap, spawn nothing, and return the current
    /// value. `get_compute` runs once per tick and may perform I/O; the
    /// update closure it returns must be pure.
    pub fn watch_call<C>(
        &self,
        get_compute: C,
        name: &str,
        tick: Duration,
    ) -> Result<Option<Value>, RuntimeError>
    where
        C: Compute,
    {
        self.session
            .watchers
            .register_poll(name, Arc::new(get_compute), tick)
    }

    /// Idempotent flow-watcher registration.
    ///
    /// The first call under `name` adopts `source` and returns `None`;
    /// subsequent calls drop the new source and return the current value.
    /// Every value received from the source triggers a re-execution.
    pub fn watch_flow(
        &self,
        source: mpsc::Receiver<Value>,
        name: &str,
    ) -> Result<Option<Value>, RuntimeError> {
        self.session.watchers.register_flow(name, source)
    }

    /// Memoized compute: runs `compute` at most once per `name` until
    /// cleared; concurrent callers share the one result.
    pub async fn memo<F, Fut>(&self, compute: F, name: &str) -> Result<Value, RuntimeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Value>,
    {
        self.session.memo.load_or_store(name, compute).await
    }

    /// Drops a memo entry; the next [`SessionCtx::memo`] recomputes.
    pub fn clear_memo(&self, name: &str) {
        self.session.memo.clear(name);
    }

    /// True once this invocation should wind down (timeout or shutdown).
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when this invocation is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
