//! Minimal session: init run, two user messages, graceful stop.
//!
//! ```bash
//! cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watchvisor::{Config, ManagedError, ManagedFn, SessionCtx, Supervisor, Value};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
        match ctx.message() {
            Some(msg) => {
                let count = ctx.update_value("handled", |current| match current {
                    Some(Value::Int(n)) => Value::Int(n + 1),
                    _ => Value::Int(1),
                });
                println!("[managed] message={msg:?} handled={count:?}");
            }
            None => println!("[managed] init run"),
        }
        Ok::<_, ManagedError>(())
    });

    let sup = Arc::new(Supervisor::new(Config::default(), managed));
    let parent = CancellationToken::new();

    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        let parent = parent.clone();
        async move { sup.run(parent).await }
    });

    // Give the init run a moment, then talk to the session.
    tokio::time::sleep(Duration::from_millis(100)).await;
    sup.send_message("hello")?;
    sup.send_message("world")?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    println!(
        "[main] lifecycle={} executions={} errors={}",
        sup.lifecycle(),
        sup.execution_count(),
        sup.error_count()
    );

    parent.cancel();
    let terminal = runner.await??;
    println!("[main] terminal={terminal}");
    Ok(())
}
