//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to recovery delays so that a fleet of
//! supervisors crashing on the same upstream outage does not retry in
//! lockstep.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Full`] random delay in [0, delay]
//! - [`JitterPolicy::Equal`] delay/2 + random[0, delay/2]
//!
//! Jitter is applied by the effect handler when a retry timer is armed, never
//! inside the reducer; the reducer stays deterministic.

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of recovery delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JitterPolicy {
    /// No jitter: use the exact computed delay.
    ///
    /// The default. Keeps the retry schedule observable and testable.
    #[default]
    None,

    /// Full jitter: random delay in [0, delay].
    ///
    /// Most aggressive load spreading; can shrink a delay to zero.
    Full,

    /// Equal jitter: delay/2 + random[0, delay/2].
    ///
    /// Preserves at least half of the computed delay.
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => self.full_jitter(delay),
            JitterPolicy::Equal => self.equal_jitter(delay),
        }
    }

    /// Full jitter: random in [0, delay].
    fn full_jitter(&self, delay: Duration) -> Duration {
        let ms = (delay.as_millis().min(u128::from(u64::MAX))) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(0..=ms))
    }

    /// Equal jitter: delay/2 + random[0, delay/2].
    fn equal_jitter(&self, delay: Duration) -> Duration {
        let ms = (delay.as_millis().min(u128::from(u64::MAX))) as u64;
        if ms == 0 {
            return Duration::ZERO;
        }
        let half = ms / 2;
        let jitter = if half == 0 {
            0
        } else {
            let mut rng = rand::rng();
            rng.random_range(0..=half)
        };
        Duration::from_millis(half + jitter)
    }
}
