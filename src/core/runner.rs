//! # Run a single managed-function invocation.
//!
//! Executes ONE invocation on its own task, then reports back to the
//! supervisor loop exclusively through the signal queue; there is no shared
//! return channel with the reducer.
//!
//! - **Timeout**: the whole invocation runs under the configured timeout;
//!   expiry cancels the invocation token and classifies as crash.
//! - **Panic isolation**: panics are caught at this boundary and classify as
//!   crash with the captured payload.
//! - **Observability**: every completion appends one effect-log entry
//!   (duration, trigger provenance, outcome label).
//!
//! ## Flow
//! ```text
//! derive invocation token (child of session token)
//! build SessionCtx {message, watcher, token}
//! run managed(ctx) under timeout, catching panics
//!   ├─ Ok                → Outcome::Ok
//!   ├─ Err(Stop/Kill)    → Outcome::Stop / Outcome::Kill
//!   ├─ Err(crash-class)  → Outcome::Crash   (incl. injected Timeout/Panic)
//!   └─ Err(other)        → Outcome::Fail
//! append effect-log entry, bump error counter on non-ok
//! clear current message, enqueue ManagedDone{outcome}
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};

use crate::error::ManagedError;
use crate::logs::EffectEntry;
use crate::managed::ManagedRef;
use crate::session::{Session, SessionCtx};
use crate::signals::{Outcome, Signal, SignalKind, SignalQueue};

pub(crate) async fn run_once(
    managed: ManagedRef,
    session: Arc<Session>,
    queue: Arc<SignalQueue>,
    timeout: Duration,
    message: Option<String>,
    watcher: Option<String>,
) {
    let token = session.cancel.child_token();
    let ctx = SessionCtx::new(
        Arc::clone(&session),
        token.clone(),
        message.clone(),
        watcher.clone(),
    );

    let started = Instant::now();
    let guarded = std::panic::AssertUnwindSafe(managed.run(ctx)).catch_unwind();

    let result = if timeout > Duration::ZERO {
        match time::timeout(timeout, guarded).await {
            Ok(inner) => flatten_panic(inner),
            Err(_elapsed) => {
                token.cancel();
                Err(ManagedError::Timeout { timeout })
            }
        }
    } else {
        flatten_panic(guarded.await)
    };

    let outcome = Outcome::classify(&result);
    // Stop/kill are requested transitions, not failures.
    if matches!(outcome, Outcome::Crash { .. } | Outcome::Fail { .. }) {
        session.stats.record_error();
    }

    session.logger.effect.push(EffectEntry {
        duration: started.elapsed(),
        message,
        watcher,
        outcome: outcome.as_label(),
        error: result.err().map(|e| e.to_string()),
    });

    // The message belongs to the finished execution only.
    session.context.set_message(None);

    // Closed queue means the session tore down underneath us; nobody is
    // listening for the outcome anymore.
    let _ = queue.try_enqueue(Signal::new(SignalKind::ManagedDone { outcome }));
}

/// Converts a caught panic payload into a crash-class error.
fn flatten_panic(
    caught: Result<Result<(), ManagedError>, Box<dyn std::any::Any + Send>>,
) -> Result<(), ManagedError> {
    match caught {
        Ok(result) => result,
        Err(payload) => {
            let reason = if let Some(msg) = payload.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(ManagedError::Panic { reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::managed::ManagedFn;
    use crate::signals::Priority;

    fn harness() -> (Arc<Session>, Arc<SignalQueue>) {
        let queue = Arc::new(SignalQueue::new(64));
        let session = Session::new(&Config::default(), Arc::clone(&queue));
        (session, queue)
    }

    #[tokio::test]
    async fn clean_return_reports_ok_and_logs_duration() {
        let (session, queue) = harness();
        let managed = ManagedFn::arc(|_ctx: SessionCtx| async { Ok(()) });

        run_once(
            managed,
            Arc::clone(&session),
            Arc::clone(&queue),
            Duration::from_secs(5),
            Some("hi".into()),
            None,
        )
        .await;

        let sig = queue.recv(Priority::Lifecycle).await.unwrap();
        assert_eq!(
            sig.kind,
            SignalKind::ManagedDone {
                outcome: Outcome::Ok
            }
        );
        let entries = session.logger.effect.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry.outcome, "ok");
        assert_eq!(entries[0].entry.message.as_deref(), Some("hi"));
        assert_eq!(session.stats.errors(), 0);
    }

    #[tokio::test]
    async fn timeout_classifies_as_crash_and_cancels_the_invocation() {
        let (session, queue) = harness();
        let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
            ctx.cancelled().await;
            Ok(())
        });

        run_once(
            managed,
            Arc::clone(&session),
            Arc::clone(&queue),
            Duration::from_millis(20),
            None,
            None,
        )
        .await;

        let sig = queue.recv(Priority::Lifecycle).await.unwrap();
        assert!(matches!(
            sig.kind,
            SignalKind::ManagedDone {
                outcome: Outcome::Crash { .. }
            }
        ));
        assert_eq!(session.stats.errors(), 1);
    }

    #[tokio::test]
    async fn panic_is_captured_as_crash() {
        let (session, queue) = harness();
        let managed = ManagedFn::arc(|_ctx: SessionCtx| async { panic!("blew up") });

        run_once(
            managed,
            Arc::clone(&session),
            Arc::clone(&queue),
            Duration::from_secs(5),
            None,
            None,
        )
        .await;

        let sig = queue.recv(Priority::Lifecycle).await.unwrap();
        let SignalKind::ManagedDone {
            outcome: Outcome::Crash { reason },
        } = sig.kind
        else {
            panic!("expected crash outcome");
        };
        assert!(reason.contains("blew up"));
    }
}
