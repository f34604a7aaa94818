//! # Recovery policy for crash-class failures.
//!
//! [`RecoveryPolicy`] maps the consecutive-failure count to a retry decision:
//!
//! ```text
//! failures < min_failures            → Lightweight(lightweight_delays[i])
//! min_failures ≤ failures < max      → Backoff(base_delay × 2^(failures − min), capped)
//! failures ≥ max_failures            → Permanent (no further retries)
//! ```
//!
//! The count fed to [`RecoveryPolicy::decide`] is the number of consecutive
//! failures seen *before* the crash being handled; with the defaults
//! (min 3, max 6) that yields three lightweight retries, three exponential
//! retries, and a permanent crash on the seventh consecutive failure.
//!
//! The policy is pure: delays come out as exact durations. Randomization, if
//! any, is layered on by [`JitterPolicy`](crate::policies::JitterPolicy) at
//! scheduling time.

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry decision for one crash-class failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Stay operational (`Ready`); rearm after the given delay.
    Lightweight(Duration),
    /// Withdraw into `WaitRecover`; retry after the given backoff delay.
    Backoff(Duration),
    /// Give up permanently (`Crashed`).
    Permanent,
}

/// Policy parameters for crash recovery.
#[derive(Clone, Debug)]
pub struct RecoveryPolicy {
    /// Failure count below which retries are lightweight (stay `Ready`).
    pub min_failures: u32,
    /// Failure count at which the supervisor crashes permanently.
    pub max_failures: u32,
    /// Initial delay for the exponential branch.
    pub base_delay: Duration,
    /// Cap for the exponential branch.
    pub max_delay: Duration,
    /// Delays for the lightweight branch, indexed by failure count
    /// (the last entry repeats when the count exceeds the list).
    pub lightweight_delays: Vec<Duration>,
    /// Randomization applied at scheduling time (not part of `decide`).
    pub jitter: JitterPolicy,
}

impl Default for RecoveryPolicy {
    /// Defaults:
    /// - `min_failures = 3`, `max_failures = 6`
    /// - `base_delay = 5s`, `max_delay = 5min`
    /// - `lightweight_delays = [15s, 30s, 60s]`
    /// - `jitter = None`
    fn default() -> Self {
        Self {
            min_failures: 3,
            max_failures: 6,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            lightweight_delays: vec![
                Duration::from_secs(15),
                Duration::from_secs(30),
                Duration::from_secs(60),
            ],
            jitter: JitterPolicy::None,
        }
    }
}

impl RecoveryPolicy {
    /// Decides the retry behavior for a crash observed after
    /// `failures_before` prior consecutive failures.
    pub fn decide(&self, failures_before: u32) -> RecoveryDecision {
        if failures_before >= self.max_failures {
            return RecoveryDecision::Permanent;
        }
        if failures_before < self.min_failures {
            return RecoveryDecision::Lightweight(self.lightweight_delay(failures_before));
        }
        RecoveryDecision::Backoff(self.backoff_delay(failures_before))
    }

    /// Delay for the lightweight branch; repeats the last entry past the end.
    fn lightweight_delay(&self, failures_before: u32) -> Duration {
        match self.lightweight_delays.len() {
            0 => self.base_delay,
            len => {
                let idx = (failures_before as usize).min(len - 1);
                self.lightweight_delays[idx]
            }
        }
    }

    /// Exponential delay `base × 2^(failures − min)`, capped at `max_delay`.
    fn backoff_delay(&self, failures_before: u32) -> Duration {
        let exp = failures_before.saturating_sub(self.min_failures);
        if exp >= 32 {
            return self.max_delay;
        }
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}
