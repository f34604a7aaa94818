//! # HTTP control surface.
//!
//! A read-only projection over the session state and the five log buffers,
//! plus the one write endpoint that enqueues a user message. The server is a
//! plain `tiny_http` loop on a dedicated thread; the control surface is
//! low-traffic observability, not a data plane. It outlives the session on
//! purpose: once the supervisor is terminal, the projections keep answering
//! and `POST /watcher/message` returns 409. [`ControlServer::stop`] (or
//! drop) ends the accept loop.
//!
//! ## Endpoints
//! | Method | Path | Body |
//! |--------|------|------|
//! | GET | `/watcher/status` | lifecycle name |
//! | GET | `/watcher/state` | execution/error counters, uptime |
//! | GET | `/watcher/config` | effective configuration |
//! | GET | `/watcher/vars` | env map |
//! | GET | `/watcher/watching` | watcher name → last value |
//! | GET | `/watcher/memoCache` | memo name → value (opaque-masked) |
//! | GET | `/watcher/varState` | context store snapshot |
//! | GET | `/watcher/logs/{reduce\|effect\|watch-error\|context\|state-fault}` | paginated dump (`offset`, `limit`) |
//! | POST | `/watcher/message` | `{"content": "..."}` → 202, or 409 once terminal |

mod routes;

use std::sync::Arc;
use std::thread;

use crate::core::Supervisor;
use crate::error::RuntimeError;
use routes::ServerState;

/// Handle to the running control server.
pub struct ControlServer {
    server: Arc<tiny_http::Server>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ControlServer {
    /// Binds the configured port and starts serving the supervisor's state.
    pub fn spawn(supervisor: &Supervisor) -> Result<Self, RuntimeError> {
        let port = supervisor.config().server_port;
        let server =
            tiny_http::Server::http(("0.0.0.0", port)).map_err(|e| RuntimeError::ServerBind {
                port,
                reason: e.to_string(),
            })?;
        let server = Arc::new(server);

        let state = ServerState {
            cfg: supervisor.config().clone(),
            session: Arc::clone(supervisor.session()),
            queue: Arc::clone(supervisor.queue()),
        };

        let worker = Arc::clone(&server);
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                routes::handle(&state, request);
            }
        });

        Ok(Self {
            server,
            thread: Some(handle),
        })
    }

    /// The address the server actually bound.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        match self.server.server_addr() {
            tiny_http::ListenAddr::IP(addr) => Ok(addr),
            #[cfg(unix)]
            tiny_http::ListenAddr::Unix(_) => Err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "control server bound to a unix socket",
            )),
        }
    }

    /// Stops the accept loop and joins the serving thread.
    pub fn stop(mut self) {
        self.server.unblock();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
