//! # The persistent context: user values, env, and the current message.
//!
//! One [`ContextStore`] per session. Three maps with different lifetimes:
//!
//! - **values**: created by `set_value`/`update_value`, persist for the
//!   session. Reads are serialized with writes by the lock; readers get
//!   clones.
//! - **env**: fixed at construction, never mutated.
//! - **message**: the user message that triggered the in-flight execution
//!   (absent for init/reactive/retry runs); owned by the effect handler.
//!
//! ## Atomic update
//! `update_value` holds the write lock across the whole read-modify-write:
//! the current value is deep-copied, handed to the closure, and the returned
//! value installed. The deep copy isolates the closure from concurrent
//! readers; primitives and absent values short-circuit it trivially. K
//! concurrent increments yield exactly K.
//!
//! Every mutation lands in the context-change log.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::logs::{ContextChangeEntry, ContextOp, Logger};
use crate::reactive::Value;

/// Session-scoped key-value store with an immutable env map.
pub struct ContextStore {
    values: RwLock<HashMap<String, Value>>,
    env: HashMap<String, String>,
    message: RwLock<Option<String>>,
    logger: Arc<Logger>,
}

impl ContextStore {
    /// Creates a store around the immutable `env` map.
    pub(crate) fn new(env: HashMap<String, String>, logger: Arc<Logger>) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            env,
            message: RwLock::new(None),
            logger,
        }
    }

    /// Returns the stored value for `key` (a clone; reads are serialized
    /// with writes).
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .expect("context store poisoned")
            .get(key)
            .cloned()
    }

    /// Assigns `value` to `key`.
    pub fn set_value(&self, key: &str, value: Value) {
        {
            let mut values = self.values.write().expect("context store poisoned");
            values.insert(key.to_string(), value);
        }
        self.logger.context_change.push(ContextChangeEntry {
            key: key.to_string(),
            op: ContextOp::Set,
        });
    }

    /// Atomic read-modify-write.
    ///
    /// The closure receives a deep copy of the current value (or `None`) and
    /// its return value replaces the entry. The whole exchange happens under
    /// the write lock, so concurrent updates serialize. Returns the
    /// installed value.
    pub fn update_value<F>(&self, key: &str, f: F) -> Value
    where
        F: FnOnce(Option<Value>) -> Value,
    {
        let installed = {
            let mut values = self.values.write().expect("context store poisoned");
            let current = values.get(key).map(Value::deep_clone);
            let next = f(current);
            values.insert(key.to_string(), next.clone());
            next
        };
        self.logger.context_change.push(ContextChangeEntry {
            key: key.to_string(),
            op: ContextOp::Update,
        });
        installed
    }

    /// Reads the immutable env map.
    pub fn get_env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    /// The full env map (control surface).
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// The user message that triggered the in-flight execution, if any.
    pub fn message(&self) -> Option<String> {
        self.message
            .read()
            .expect("context store poisoned")
            .clone()
    }

    pub(crate) fn set_message(&self, message: Option<String>) {
        *self.message.write().expect("context store poisoned") = message;
    }

    /// Sorted snapshot of the value map (control surface).
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let values = self.values.read().expect("context store poisoned");
        let mut rows: Vec<_> = values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}
