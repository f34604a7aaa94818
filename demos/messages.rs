//! Lifecycle control through message content: non-fatal failures, a crash
//! with recovery, then a graceful stop requested by the managed function.
//!
//! ```bash
//! cargo run --example messages
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watchvisor::{Config, Lifecycle, ManagedError, ManagedFn, SessionCtx, Supervisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
        match ctx.message().as_deref() {
            Some("flaky") => Err(ManagedError::fail("transient upstream error")),
            Some("crash") => Err(ManagedError::crash("simulated outage")),
            Some("quit") => Err(ManagedError::stop("operator request")),
            other => {
                println!("[managed] trigger={other:?}");
                Ok(())
            }
        }
    });

    let mut cfg = Config::default();
    cfg.recovery.lightweight_delays = vec![Duration::from_millis(200)];

    let sup = Arc::new(Supervisor::new(cfg, managed));
    let runner = tokio::spawn({
        let sup = Arc::clone(&sup);
        async move { sup.run(CancellationToken::new()).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    for msg in ["work", "flaky", "crash", "work again", "quit"] {
        sup.send_message(msg)?;
        tokio::time::sleep(Duration::from_millis(400)).await;
        println!(
            "[main] after {msg:?}: lifecycle={} errors={}",
            sup.lifecycle(),
            sup.error_count()
        );
    }

    let terminal = runner.await??;
    assert_eq!(terminal, Lifecycle::Stopped);

    println!("--- reduce log ---");
    for entry in sup.logs().reduce.snapshot() {
        println!(
            "#{:<3} {:<20} {} -> {}",
            entry.id, entry.entry.signal, entry.entry.from, entry.entry.to
        );
    }
    Ok(())
}
