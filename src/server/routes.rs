//! Request routing and JSON projections for the control surface.

use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tiny_http::{Header, Method, Request, Response};

use crate::config::Config;
use crate::error::RuntimeError;
use crate::session::Session;
use crate::signals::SignalQueue;

/// Shared state captured by the serving thread.
pub(super) struct ServerState {
    pub(super) cfg: Config,
    pub(super) session: Arc<Session>,
    pub(super) queue: Arc<SignalQueue>,
}

#[derive(Deserialize)]
struct MessageBody {
    content: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct StateResponse {
    #[serde(rename = "executionCount")]
    execution_count: u64,
    #[serde(rename = "errorCount")]
    error_count: u64,
    #[serde(rename = "uptimeSeconds")]
    uptime_seconds: f64,
}

/// Routes one request. Never panics; malformed input maps to 4xx.
pub(super) fn handle(state: &ServerState, mut request: Request) {
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (url, String::new()),
    };

    let method = request.method().clone();
    let response = if method == Method::Get {
        match path.as_str() {
            "/watcher/status" => json_response(
                200,
                &StatusResponse {
                    status: state.session.lifecycle().as_str(),
                },
            ),
            "/watcher/state" => json_response(
                200,
                &StateResponse {
                    execution_count: state.session.stats.executions(),
                    error_count: state.session.stats.errors(),
                    uptime_seconds: state
                        .session
                        .stats
                        .uptime()
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0),
                },
            ),
            "/watcher/config" => json_value_response(200, config_json(&state.cfg)),
            "/watcher/vars" => {
                json_value_response(200, json!(state.session.context.env().clone()))
            }
            "/watcher/watching" => json_value_response(200, watching_json(state)),
            "/watcher/memoCache" => {
                let entries: serde_json::Map<String, serde_json::Value> = state
                    .session
                    .memo
                    .snapshot()
                    .into_iter()
                    .map(|(name, value)| (name, value.to_json()))
                    .collect();
                json_value_response(200, serde_json::Value::Object(entries))
            }
            "/watcher/varState" => {
                let entries: serde_json::Map<String, serde_json::Value> = state
                    .session
                    .context
                    .snapshot()
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json()))
                    .collect();
                json_value_response(200, serde_json::Value::Object(entries))
            }
            logs if logs.starts_with("/watcher/logs/") => {
                logs_page(state, &logs["/watcher/logs/".len()..], &query)
            }
            _ => error_response(404, "not found"),
        }
    } else if method == Method::Post && path == "/watcher/message" {
        post_message(state, &mut request)
    } else {
        error_response(405, "method not allowed")
    };

    let _ = request.respond(response);
}

fn post_message(state: &ServerState, request: &mut Request) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut body = String::new();
    if request.as_reader().read_to_string(&mut body).is_err() {
        return error_response(400, "unreadable body");
    }
    let Ok(message) = serde_json::from_str::<MessageBody>(&body) else {
        return error_response(400, "expected {\"content\": \"...\"}");
    };

    match state.session.submit_message(&state.queue, message.content) {
        Ok(()) => json_value_response(202, json!({ "status": "accepted" })),
        Err(RuntimeError::Terminated { lifecycle }) => json_value_response(
            409,
            json!({ "error": "terminal", "status": lifecycle.as_str() }),
        ),
        Err(RuntimeError::QueueClosed) => {
            json_value_response(409, json!({ "error": "session closed" }))
        }
        Err(RuntimeError::QueueFull { capacity }) => {
            json_value_response(503, json!({ "error": "queue full", "capacity": capacity }))
        }
        Err(other) => json_value_response(500, json!({ "error": other.as_label() })),
    }
}

fn logs_page(
    state: &ServerState,
    buffer: &str,
    query: &str,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let (offset, limit) = page_params(query);
    let logger = &state.session.logger;

    let (total, entries): (usize, Vec<serde_json::Value>) = match buffer {
        "reduce" => {
            let (total, page) = logger.reduce.page(offset, limit);
            (
                total,
                page.into_iter()
                    .map(|s| {
                        let body = json!({
                            "from": s.entry.from.as_str(),
                            "to": s.entry.to.as_str(),
                            "signal": s.entry.signal,
                        });
                        stamped_json(s.id, s.at, body)
                    })
                    .collect(),
            )
        }
        "effect" => {
            let (total, page) = logger.effect.page(offset, limit);
            (
                total,
                page.into_iter()
                    .map(|s| {
                        let body = json!({
                            "durationMs": s.entry.duration.as_millis() as u64,
                            "message": s.entry.message,
                            "watcher": s.entry.watcher,
                            "outcome": s.entry.outcome,
                            "error": s.entry.error,
                        });
                        stamped_json(s.id, s.at, body)
                    })
                    .collect(),
            )
        }
        "watch-error" => {
            let (total, page) = logger.watch_error.page(offset, limit);
            (
                total,
                page.into_iter()
                    .map(|s| {
                        let body = json!({
                            "watcher": s.entry.watcher,
                            "reason": s.entry.reason,
                        });
                        stamped_json(s.id, s.at, body)
                    })
                    .collect(),
            )
        }
        "context" => {
            let (total, page) = logger.context_change.page(offset, limit);
            (
                total,
                page.into_iter()
                    .map(|s| {
                        let body = json!({
                            "key": s.entry.key,
                            "op": s.entry.op.as_label(),
                        });
                        stamped_json(s.id, s.at, body)
                    })
                    .collect(),
            )
        }
        "state-fault" => {
            let (total, page) = logger.state_fault.page(offset, limit);
            (
                total,
                page.into_iter()
                    .map(|s| {
                        let body = json!({
                            "lifecycle": s.entry.lifecycle.as_str(),
                            "signal": s.entry.signal,
                        });
                        stamped_json(s.id, s.at, body)
                    })
                    .collect(),
            )
        }
        _ => return error_response(404, "unknown log buffer"),
    };

    json_value_response(
        200,
        json!({
            "total": total,
            "offset": offset,
            "entries": entries,
        }),
    )
}

/// Parses `offset`/`limit` query parameters; limit defaults to 100, capped
/// at 1000.
fn page_params(query: &str) -> (usize, usize) {
    let mut offset = 0usize;
    let mut limit = 100usize;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "offset" => offset = value.parse().unwrap_or(0),
            "limit" => limit = value.parse().unwrap_or(100),
            _ => {}
        }
    }
    (offset, limit.clamp(1, 1000))
}

fn stamped_json(id: u64, at: std::time::SystemTime, entry: serde_json::Value) -> serde_json::Value {
    let at = at
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    json!({
        "id": id,
        "at": at,
        "entry": entry,
    })
}

fn config_json(cfg: &Config) -> serde_json::Value {
    json!({
        "name": cfg.name,
        "timeoutSeconds": cfg.timeout.as_secs_f64(),
        "serverPort": cfg.server_port,
        "maxLogEntries": cfg.max_log_entries,
        "maxWatches": cfg.max_watches,
        "maxMemoEntries": cfg.max_memo_entries,
        "signalChanCapacity": cfg.signal_capacity,
        "recovery": {
            "minConsecutiveFailures": cfg.recovery.min_failures,
            "maxConsecutiveFailures": cfg.recovery.max_failures,
            "baseRetryDelaySeconds": cfg.recovery.base_delay.as_secs_f64(),
            "maxRetryDelaySeconds": cfg.recovery.max_delay.as_secs_f64(),
            "lightweightRetryDelaysSeconds": cfg
                .recovery
                .lightweight_delays
                .iter()
                .map(|d| d.as_secs_f64())
                .collect::<Vec<_>>(),
        },
    })
}

fn watching_json(state: &ServerState) -> serde_json::Value {
    let entries: serde_json::Map<String, serde_json::Value> = state
        .session
        .watchers
        .snapshot()
        .into_iter()
        .map(|(name, kind, last, active)| {
            (
                name,
                json!({
                    "kind": kind,
                    "lastValue": last.map(|v| v.to_json()),
                    "active": active,
                }),
            )
        })
        .collect();
    serde_json::Value::Object(entries)
}

fn json_response<T: Serialize>(code: u16, body: &T) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    with_json_header(Response::from_string(body).with_status_code(code))
}

fn json_value_response(code: u16, body: serde_json::Value) -> Response<std::io::Cursor<Vec<u8>>> {
    with_json_header(Response::from_string(body.to_string()).with_status_code(code))
}

fn error_response(code: u16, message: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    json_value_response(code, json!({ "error": message }))
}

fn with_json_header(
    response: Response<std::io::Cursor<Vec<u8>>>,
) -> Response<std::io::Cursor<Vec<u8>>> {
    match Header::from_bytes("Content-Type", "application/json") {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}
