//! # Session-scoped memoization cache.
//!
//! The classic load-or-store primitive over dynamic values: for a given
//! name, the compute function runs **at most once** until the entry is
//! cleared, no matter how many callers race on it. Concurrent callers all
//! observe the one computed value.
//!
//! ## Rules
//! - One `tokio::sync::OnceCell` per name; the map lock is only held for the
//!   cell lookup/insert, never across the compute.
//! - Capacity overflow **rejects** the insert (logged warning). Eviction
//!   would break the at-most-once contract; memo identity is semantic.
//! - `clear` removes the entry; an in-flight compute still completes for its
//!   waiters, but the next call recomputes into a fresh cell.
//! - The cache never triggers re-execution; it is a side-effect-free cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::RuntimeError;
use crate::logs::{ContextChangeEntry, ContextOp, Logger};
use crate::reactive::Value;

/// Bounded load-or-store cache keyed by name.
pub struct MemoCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
    limit: usize,
    logger: Arc<Logger>,
}

impl MemoCache {
    /// Creates a cache holding at most `limit` entries.
    pub(crate) fn new(limit: usize, logger: Arc<Logger>) -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            limit,
            logger,
        }
    }

    /// Returns the memoized value for `name`, computing it on first call.
    ///
    /// Concurrent callers with the same name share one compute; everyone
    /// gets a clone of the same value. At capacity, inserting a new name
    /// fails with [`RuntimeError::MemoCapacity`] and a logged warning.
    pub async fn load_or_store<F, Fut>(&self, name: &str, compute: F) -> Result<Value, RuntimeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Value>,
    {
        let cell = {
            let mut cells = self.cells.lock().expect("memo cache poisoned");
            if let Some(cell) = cells.get(name) {
                Arc::clone(cell)
            } else {
                if cells.len() >= self.limit {
                    self.logger.context_change.push(ContextChangeEntry {
                        key: name.to_string(),
                        op: ContextOp::MemoRejected,
                    });
                    return Err(RuntimeError::MemoCapacity { limit: self.limit });
                }
                let cell = Arc::new(OnceCell::new());
                cells.insert(name.to_string(), Arc::clone(&cell));
                cell
            }
        };

        Ok(cell.get_or_init(compute).await.clone())
    }

    /// Removes the entry; the next `load_or_store` recomputes.
    pub fn clear(&self, name: &str) {
        self.cells
            .lock()
            .expect("memo cache poisoned")
            .remove(name);
    }

    /// Number of entries (including in-flight computes).
    pub fn len(&self) -> usize {
        self.cells.lock().expect("memo cache poisoned").len()
    }

    /// True when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the settled entries (control surface). In-flight
    /// computes are omitted.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let cells = self.cells.lock().expect("memo cache poisoned");
        let mut rows: Vec<_> = cells
            .iter()
            .filter_map(|(name, cell)| cell.get().map(|v| (name.clone(), v.clone())))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn cache(limit: usize) -> MemoCache {
        MemoCache::new(limit, Arc::new(Logger::new(64)))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_compute() {
        let memo = Arc::new(cache(8));
        let runs = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let memo = Arc::clone(&memo);
            let runs = Arc::clone(&runs);
            tasks.push(tokio::spawn(async move {
                memo.load_or_store("slow", || async {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Value::Str("expensive".into())
                })
                .await
                .unwrap()
            }));
        }

        let mut results = Vec::new();
        for t in tasks {
            results.push(t.await.unwrap());
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|v| *v == Value::Str("expensive".into())));
    }

    #[tokio::test]
    async fn clear_allows_recompute() {
        let memo = cache(8);
        let runs = AtomicU32::new(0);

        for _ in 0..2 {
            memo.load_or_store("k", || async {
                runs.fetch_add(1, Ordering::SeqCst);
                Value::Int(1)
            })
            .await
            .unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        memo.clear("k");
        memo.load_or_store("k", || async {
            runs.fetch_add(1, Ordering::SeqCst);
            Value::Int(2)
        })
        .await
        .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overflow_rejects_instead_of_evicting() {
        let memo = cache(1);
        memo.load_or_store("kept", || async { Value::Int(1) })
            .await
            .unwrap();

        let err = memo
            .load_or_store("extra", || async { Value::Int(2) })
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::MemoCapacity { limit: 1 }));

        // The resident entry is untouched and still answers without
        // recomputing.
        let v = memo
            .load_or_store("kept", || async { Value::Int(99) })
            .await
            .unwrap();
        assert_eq!(v, Value::Int(1));
        assert_eq!(memo.logger.context_change.len(), 1);
    }
}
