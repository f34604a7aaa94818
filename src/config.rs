//! # Global runtime configuration.
//!
//! [`Config`] defines one supervisor instance's behavior: managed-function
//! timeout, queue and log bounds, watcher/memo limits, the recovery policy,
//! and the immutable environment map handed to the managed function.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use watchvisor::{Config, JitterPolicy};
//!
//! let mut cfg = Config::default();
//! cfg.timeout = Duration::from_secs(5);
//! cfg.recovery.base_delay = Duration::from_secs(1);
//! cfg.recovery.jitter = JitterPolicy::Equal;
//! cfg.env.insert("REGION".into(), "eu-west-1".into());
//!
//! assert_eq!(cfg.signal_capacity, 50_000);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::policies::RecoveryPolicy;

/// Global configuration for one supervisor instance.
///
/// Controls the managed-function timeout, queue/log/watcher/memo bounds, the
/// crash-recovery policy, and the environment map. Everything is fixed at
/// construction; there is no hot reload.
#[derive(Clone, Debug)]
pub struct Config {
    /// Instance name (used in demo output and server banner).
    pub name: String,
    /// Timeout for every managed-function invocation.
    pub timeout: Duration,
    /// Listen port for the HTTP control surface.
    pub server_port: u16,
    /// Capacity of each of the five ring logs.
    pub max_log_entries: usize,
    /// Maximum number of registered watchers.
    pub max_watches: usize,
    /// Maximum number of memo entries (overflow rejects, never evicts).
    pub max_memo_entries: usize,
    /// Capacity of the signal queue (user + reactive classes; lifecycle
    /// signals are always accepted).
    pub signal_capacity: usize,
    /// Crash-recovery policy.
    pub recovery: RecoveryPolicy,
    /// Environment map exposed to the managed function. Immutable after
    /// construction.
    pub env: HashMap<String, String>,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `timeout = 60s`
    /// - `server_port = 8080`
    /// - `max_log_entries = 50_000`
    /// - `max_watches = 1_000`
    /// - `max_memo_entries = 1_000`
    /// - `signal_capacity = 50_000`
    /// - `recovery = RecoveryPolicy::default()`
    fn default() -> Self {
        Self {
            name: "watcher".to_string(),
            timeout: Duration::from_secs(60),
            server_port: 8080,
            max_log_entries: 50_000,
            max_watches: 1_000,
            max_memo_entries: 1_000,
            signal_capacity: 50_000,
            recovery: RecoveryPolicy::default(),
            env: HashMap::new(),
        }
    }
}
