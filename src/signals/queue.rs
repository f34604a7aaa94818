//! # Bounded three-class priority queue feeding the supervisor loop.
//!
//! [`SignalQueue`] is the single channel between the outside world (user
//! messages, watcher tasks, retry timers, managed-invocation completions)
//! and the supervisor loop.
//!
//! ## Contract
//! - **Strict priority**: no user signal dequeues while lifecycle traffic is
//!   pending; no reactive signal dequeues while either higher class is
//!   pending. Starvation of the reactive class is accepted and intended.
//! - **FIFO within a class**: per-class queues keyed by a queue-scoped
//!   monotonic sequence number.
//! - **Bounded**: the capacity applies to the user and reactive classes.
//!   Lifecycle signals are always accepted; losing a `ManagedDone` would
//!   wedge the state machine.
//! - **Lossless**: nothing is dropped on overflow; `try_enqueue` reports
//!   `QueueFull` and the producer decides.
//!
//! ## Consumer-side gating
//! [`SignalQueue::recv`] takes a maximum priority class. While an execution
//! is in flight the supervisor passes [`Priority::Lifecycle`], which leaves
//! user/reactive signals parked in FIFO order until the machine is back in
//! `Ready`. This is how "exactly one in-flight execution" and user-message
//! ordering are both kept without dropping anything.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::RuntimeError;
use crate::signals::signal::{Priority, Signal};

struct QueueState {
    /// One FIFO per priority class, indexed by `Priority as usize`.
    classes: [VecDeque<Signal>; 3],
    /// Next sequence number to stamp.
    next_seq: u64,
    closed: bool,
}

impl QueueState {
    fn bounded_len(&self) -> usize {
        self.classes[Priority::User as usize].len() + self.classes[Priority::Reactive as usize].len()
    }

    fn pop_up_to(&mut self, max: Priority) -> Option<Signal> {
        for class in 0..=(max as usize) {
            if let Some(sig) = self.classes[class].pop_front() {
                return Some(sig);
            }
        }
        None
    }
}

/// Bounded, lossless, three-class priority queue.
pub struct SignalQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl SignalQueue {
    /// Creates a queue whose user+reactive classes hold at most `capacity`
    /// signals combined.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                classes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                next_seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues a signal without blocking.
    ///
    /// Lifecycle signals are always accepted (unless the queue is closed).
    /// User/reactive signals fail with [`RuntimeError::QueueFull`] at
    /// capacity.
    pub fn try_enqueue(&self, mut signal: Signal) -> Result<(), RuntimeError> {
        let priority = signal.priority();
        {
            let mut state = self.state.lock().expect("signal queue poisoned");
            if state.closed {
                return Err(RuntimeError::QueueClosed);
            }
            if priority != Priority::Lifecycle && state.bounded_len() >= self.capacity {
                return Err(RuntimeError::QueueFull {
                    capacity: self.capacity,
                });
            }
            signal.seq = state.next_seq;
            state.next_seq += 1;
            state.classes[priority as usize].push_back(signal);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Waits for the next signal of priority at or above `max` (numerically
    /// `<= max`). Returns `None` once the queue is closed and no eligible
    /// signal remains.
    pub async fn recv(&self, max: Priority) -> Option<Signal> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().expect("signal queue poisoned");
                if let Some(sig) = state.pop_up_to(max) {
                    return Some(sig);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Removes and returns the next pending signal of any class, without
    /// waiting. Used by the terminal drain.
    pub fn try_recv_any(&self) -> Option<Signal> {
        let mut state = self.state.lock().expect("signal queue poisoned");
        state.pop_up_to(Priority::Reactive)
    }

    /// Closes the queue. Pending signals stay drainable; further enqueues
    /// fail with [`RuntimeError::QueueClosed`].
    pub fn close(&self) {
        {
            let mut state = self.state.lock().expect("signal queue poisoned");
            state.closed = true;
        }
        self.notify.notify_waiters();
    }

    /// Number of pending signals across all classes.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("signal queue poisoned");
        state.classes.iter().map(VecDeque::len).sum()
    }

    /// True when no signal is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal::SignalKind;

    fn user(content: &str) -> Signal {
        Signal::new(SignalKind::UserMessage {
            content: content.into(),
        })
    }

    fn reactive(watcher: &str) -> Signal {
        Signal::new(SignalKind::ReactiveChange {
            watcher: watcher.into(),
        })
    }

    #[tokio::test]
    async fn lifecycle_beats_earlier_lower_classes() {
        let q = SignalQueue::new(16);
        q.try_enqueue(reactive("w")).unwrap();
        q.try_enqueue(user("u")).unwrap();
        q.try_enqueue(Signal::new(SignalKind::Stop)).unwrap();

        let first = q.recv(Priority::Reactive).await.unwrap();
        assert_eq!(first.kind, SignalKind::Stop);
        let second = q.recv(Priority::Reactive).await.unwrap();
        assert!(matches!(second.kind, SignalKind::UserMessage { .. }));
        let third = q.recv(Priority::Reactive).await.unwrap();
        assert!(matches!(third.kind, SignalKind::ReactiveChange { .. }));
    }

    #[tokio::test]
    async fn fifo_within_a_class() {
        let q = SignalQueue::new(16);
        q.try_enqueue(user("first")).unwrap();
        q.try_enqueue(user("second")).unwrap();

        let a = q.recv(Priority::Reactive).await.unwrap();
        let b = q.recv(Priority::Reactive).await.unwrap();
        assert!(a.seq < b.seq);
        assert_eq!(
            a.kind,
            SignalKind::UserMessage {
                content: "first".into()
            }
        );
        assert_eq!(
            b.kind,
            SignalKind::UserMessage {
                content: "second".into()
            }
        );
    }

    #[tokio::test]
    async fn recv_gated_to_lifecycle_parks_lower_classes() {
        let q = SignalQueue::new(16);
        q.try_enqueue(user("parked")).unwrap();

        // Nothing eligible at lifecycle-only; a later lifecycle signal is
        // picked up while the user signal stays parked.
        let waiter = async {
            let sig = q.recv(Priority::Lifecycle).await.unwrap();
            assert_eq!(sig.kind, SignalKind::InitRun);
        };
        let producer = async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            q.try_enqueue(Signal::new(SignalKind::InitRun)).unwrap();
        };
        tokio::join!(waiter, producer);

        assert_eq!(q.len(), 1);
        let parked = q.recv(Priority::Reactive).await.unwrap();
        assert!(matches!(parked.kind, SignalKind::UserMessage { .. }));
    }

    #[tokio::test]
    async fn capacity_bounds_user_and_reactive_but_not_lifecycle() {
        let q = SignalQueue::new(2);
        q.try_enqueue(user("1")).unwrap();
        q.try_enqueue(reactive("2")).unwrap();
        assert!(matches!(
            q.try_enqueue(user("3")),
            Err(RuntimeError::QueueFull { capacity: 2 })
        ));
        // Lifecycle is exempt from the bound.
        q.try_enqueue(Signal::new(SignalKind::Stop)).unwrap();
        assert_eq!(q.len(), 3);
    }

    #[tokio::test]
    async fn close_rejects_enqueue_and_wakes_receiver() {
        let q = std::sync::Arc::new(SignalQueue::new(4));
        let q2 = q.clone();
        let receiver = tokio::spawn(async move { q2.recv(Priority::Reactive).await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        q.close();
        assert!(receiver.await.unwrap().is_none());
        assert!(matches!(
            q.try_enqueue(user("late")),
            Err(RuntimeError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn drain_after_close_returns_pending_signals() {
        let q = SignalQueue::new(4);
        q.try_enqueue(user("pending")).unwrap();
        q.close();
        assert!(q.try_recv_any().is_some());
        assert!(q.try_recv_any().is_none());
    }
}
