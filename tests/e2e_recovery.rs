//! End-to-end crash recovery: the lightweight → backoff → permanent
//! schedule, counter reset on success, and terminal stickiness.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watchvisor::{
    CleanupFn, Config, Lifecycle, ManagedError, ManagedFn, RuntimeError, SessionCtx, Supervisor,
    UpdateFn, Value,
};

fn recovery_config() -> Config {
    let mut cfg = Config::default();
    cfg.timeout = Duration::from_secs(5);
    cfg.recovery.min_failures = 3;
    cfg.recovery.max_failures = 6;
    cfg.recovery.base_delay = Duration::from_millis(20);
    cfg.recovery.max_delay = Duration::from_millis(200);
    cfg.recovery.lightweight_delays = vec![
        Duration::from_millis(10),
        Duration::from_millis(10),
        Duration::from_millis(10),
    ];
    cfg
}

async fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn five_crashes_then_success_recovers() {
    let crashes = Arc::new(AtomicU32::new(0));
    let managed = ManagedFn::arc({
        let crashes = Arc::clone(&crashes);
        move |_ctx: SessionCtx| {
            let crashes = Arc::clone(&crashes);
            async move {
                if crashes.fetch_add(1, Ordering::SeqCst) < 5 {
                    Err(ManagedError::crash("still broken"))
                } else {
                    Ok(())
                }
            }
        }
    });

    let sup = Arc::new(Supervisor::new(recovery_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    // Init + 5 retries: the sixth invocation succeeds and lands in Ready.
    wait_for(|| sup.execution_count() == 6 && sup.lifecycle() == Lifecycle::Ready).await;
    assert_eq!(sup.error_count(), 5);

    let reduce = sup.logs().reduce.snapshot();
    let crash_count = reduce
        .iter()
        .filter(|s| s.entry.signal == "managed_done_crash")
        .count();
    assert_eq!(crash_count, 5);

    // Crashes 1-3 retry lightweight (stay Ready); 4-5 withdraw into
    // WaitRecover before the timer brings them back.
    let wait_recover_entries = reduce
        .iter()
        .filter(|s| s.entry.to == Lifecycle::WaitRecover)
        .count();
    assert_eq!(wait_recover_entries, 2);

    // The recovered supervisor keeps serving triggers.
    let before = sup.execution_count();
    sup.send_message("go").unwrap();
    wait_for(|| sup.execution_count() > before).await;

    parent.cancel();
    let terminal = runner.await.unwrap().unwrap();
    assert_eq!(terminal, Lifecycle::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unbroken_crashes_end_in_permanent_crashed() {
    let cleanups = Arc::new(AtomicU32::new(0));
    let managed =
        ManagedFn::arc(|_ctx: SessionCtx| async { Err(ManagedError::crash("always")) });
    let cleanup = CleanupFn::arc({
        let cleanups = Arc::clone(&cleanups);
        move || {
            let cleanups = Arc::clone(&cleanups);
            async move {
                cleanups.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    });

    let mut cfg = recovery_config();
    cfg.recovery.min_failures = 1;
    cfg.recovery.max_failures = 2;
    cfg.recovery.lightweight_delays = vec![Duration::from_millis(10)];

    let sup = Arc::new(Supervisor::with_cleanup(cfg, managed, cleanup));
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.run(CancellationToken::new()).await }
    });

    // Crash 1: lightweight. Crash 2: backoff. Crash 3: permanent.
    let terminal = runner.await.unwrap().unwrap();
    assert_eq!(terminal, Lifecycle::Crashed);
    assert_eq!(sup.execution_count(), 3);

    // Cleanup ran exactly once across the whole crash sequence.
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    // Terminal stickiness: later messages only produce fault entries.
    let faults_before = sup.logs().state_fault.len();
    let err = sup.send_message("anyone there?").unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Terminated {
            lifecycle: Lifecycle::Crashed
        }
    ));
    assert_eq!(sup.logs().state_fault.len(), faults_before + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watchers_registered_before_an_init_crash_still_start() {
    let runs = Arc::new(AtomicU32::new(0));
    let managed = ManagedFn::arc({
        let runs = Arc::clone(&runs);
        move |ctx: SessionCtx| {
            let runs = Arc::clone(&runs);
            async move {
                ctx.watch_call(
                    || async {
                        Box::new(move |prev: Option<&Value>| {
                            let next = Value::Int(5);
                            let changed = prev != Some(&next);
                            Ok((next, changed))
                        }) as UpdateFn
                    },
                    "boot",
                    Duration::from_millis(15),
                )?;
                if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(ManagedError::crash("cold start"));
                }
                Ok(())
            }
        }
    });

    let sup = Arc::new(Supervisor::new(recovery_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    // The init run registers the watcher and crashes (lightweight retry).
    // The gate still opens, so the bootstrap change re-runs the managed
    // function without needing the retry timer.
    wait_for(|| sup.execution_count() >= 2 && sup.lifecycle() == Lifecycle::Ready).await;

    let watching = sup.watching();
    assert_eq!(watching.len(), 1);
    assert_eq!(watching[0].0, "boot");
    assert_eq!(watching[0].2, Some(Value::Int(5)));
    assert!(watching[0].3, "watcher task should be running");

    parent.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_is_treated_as_a_crash() {
    let mut cfg = recovery_config();
    cfg.timeout = Duration::from_millis(30);

    let runs = Arc::new(AtomicU32::new(0));
    let managed = ManagedFn::arc({
        let runs = Arc::clone(&runs);
        move |ctx: SessionCtx| {
            let runs = Arc::clone(&runs);
            async move {
                if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                    // Hang until the timeout cancels us.
                    ctx.cancelled().await;
                }
                Ok(())
            }
        }
    });

    let sup = Arc::new(Supervisor::new(cfg, managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    // The hung init run times out (crash #1, lightweight) and the retry
    // succeeds.
    wait_for(|| sup.execution_count() == 2 && sup.lifecycle() == Lifecycle::Ready).await;
    assert_eq!(sup.error_count(), 1);

    let effect = sup.logs().effect.snapshot();
    assert_eq!(effect[0].entry.outcome, "crash");
    assert!(effect[0]
        .entry
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));

    parent.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panic_recovers_like_a_crash() {
    let runs = Arc::new(AtomicU32::new(0));
    let managed = ManagedFn::arc({
        let runs = Arc::clone(&runs);
        move |_ctx: SessionCtx| {
            let runs = Arc::clone(&runs);
            async move {
                if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first run explodes");
                }
                Ok(())
            }
        }
    });

    let sup = Arc::new(Supervisor::new(recovery_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    wait_for(|| sup.execution_count() == 2 && sup.lifecycle() == Lifecycle::Ready).await;

    let effect = sup.logs().effect.snapshot();
    assert_eq!(effect[0].entry.outcome, "crash");
    assert!(effect[0]
        .entry
        .error
        .as_deref()
        .is_some_and(|e| e.contains("first run explodes")));

    parent.cancel();
    runner.await.unwrap().unwrap();
}
