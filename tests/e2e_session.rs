//! End-to-end session-state scenarios: memo across executions, context
//! persistence, env access, and trigger provenance.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watchvisor::{Config, Lifecycle, ManagedFn, SessionCtx, Supervisor, Value};

fn session_config() -> Config {
    let mut cfg = Config::default();
    cfg.timeout = Duration::from_secs(5);
    cfg.env.insert("REGION".into(), "eu-west-1".into());
    cfg
}

async fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn memo_computes_once_across_executions_until_cleared() {
    let computes = Arc::new(AtomicU32::new(0));
    let managed = ManagedFn::arc({
        let computes = Arc::clone(&computes);
        move |ctx: SessionCtx| {
            let computes = Arc::clone(&computes);
            async move {
                if ctx.message().as_deref() == Some("reset") {
                    ctx.clear_memo("expensive");
                }
                let v = ctx
                    .memo(
                        || {
                            let computes = Arc::clone(&computes);
                            async move {
                                computes.fetch_add(1, Ordering::SeqCst);
                                Value::Int(99)
                            }
                        },
                        "expensive",
                    )
                    .await?;
                assert_eq!(v, Value::Int(99));
                Ok(())
            }
        }
    });

    let sup = Arc::new(Supervisor::new(session_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    wait_for(|| sup.lifecycle() == Lifecycle::Ready).await;
    sup.send_message("again").unwrap();
    wait_for(|| sup.execution_count() == 2 && sup.lifecycle() == Lifecycle::Ready).await;
    assert_eq!(computes.load(Ordering::SeqCst), 1);
    assert_eq!(sup.memo_entries(), vec![("expensive".into(), Value::Int(99))]);

    // Clearing forces exactly one recompute.
    sup.send_message("reset").unwrap();
    wait_for(|| sup.execution_count() == 3 && sup.lifecycle() == Lifecycle::Ready).await;
    assert_eq!(computes.load(Ordering::SeqCst), 2);

    parent.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn context_values_persist_across_executions() {
    let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
        ctx.update_value("runs", |current| match current {
            Some(Value::Int(n)) => Value::Int(n + 1),
            _ => Value::Int(1),
        });
        Ok(())
    });

    let sup = Arc::new(Supervisor::new(session_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    wait_for(|| sup.lifecycle() == Lifecycle::Ready).await;
    for _ in 0..3 {
        sup.send_message("tick").unwrap();
    }
    wait_for(|| sup.execution_count() == 4 && sup.lifecycle() == Lifecycle::Ready).await;

    assert_eq!(
        sup.context_entries(),
        vec![("runs".to_string(), Value::Int(4))]
    );
    // One context-change entry per update.
    assert_eq!(sup.logs().context_change.len(), 4);

    parent.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn env_is_visible_and_provenance_is_absent_on_init() {
    let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
        assert_eq!(ctx.get_env("REGION").as_deref(), Some("eu-west-1"));
        assert_eq!(ctx.get_env("MISSING"), None);
        if ctx.message().is_none() {
            // Init run: no user message, no triggering watcher.
            assert_eq!(ctx.watcher_id(), None);
        }
        Ok(())
    });

    let sup = Arc::new(Supervisor::new(session_config(), managed));
    let parent = CancellationToken::new();
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    wait_for(|| sup.lifecycle() == Lifecycle::Ready).await;
    assert_eq!(sup.error_count(), 0, "assertions inside the run failed");

    parent.cancel();
    let terminal = runner.await.unwrap().unwrap();
    assert_eq!(terminal, Lifecycle::Stopped);
}
