//! Poll watcher + HTTP control surface, running until Ctrl-C.
//!
//! ```bash
//! cargo run --example watching
//! # elsewhere:
//! curl localhost:8080/watcher/watching
//! curl -X POST localhost:8080/watcher/message -d '{"content": "hi"}'
//! ```

use std::sync::Arc;
use std::time::Duration;

use watchvisor::{
    Config, ControlServer, ManagedError, ManagedFn, SessionCtx, Supervisor, UpdateFn, Value,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let managed = ManagedFn::arc(|ctx: SessionCtx| async move {
        // Idempotent: the first call registers, later calls read.
        let seconds = ctx.watch_call(sample_clock, "coarse-clock", Duration::from_secs(2))?;
        println!(
            "[managed] trigger: message={:?} watcher={:?} clock={:?}",
            ctx.message(),
            ctx.watcher_id(),
            seconds
        );
        Ok::<_, ManagedError>(())
    });

    let sup = Arc::new(Supervisor::new(Config::default(), managed));
    let server = ControlServer::spawn(&sup)?;
    println!("[main] control surface on {:?}", server.local_addr()?);

    let terminal = sup.run_with_os_signals().await?;
    println!("[main] terminal={terminal}");
    server.stop();
    Ok(())
}

/// Samples wall-clock seconds, quantized so the value only changes every
/// ten seconds; unchanged samples do not re-trigger the managed function.
fn sample_clock() -> std::pin::Pin<Box<dyn std::future::Future<Output = UpdateFn> + Send>> {
    Box::pin(async {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() / 10)
            .unwrap_or(0);
        Box::new(move |prev: Option<&Value>| {
            let next = Value::Int(now as i64);
            let changed = prev != Some(&next);
            Ok((next, changed))
        }) as UpdateFn
    })
}
