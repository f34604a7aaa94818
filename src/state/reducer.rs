//! # The reducer: pure state-transition function.
//!
//! `reduce(machine, signal, recovery) → Step` computes the next machine
//! state and the effects to execute. It reads no clocks, no randomness, and
//! performs no I/O; retry delays come from the [`RecoveryPolicy`] parameter
//! as exact durations (jitter is applied later, by the effect handler).
//! Repeated calls with the same inputs produce identical outputs.
//!
//! ## Transition policy
//! - Terminal states accept nothing; every signal there is a fault.
//! - A crash-class outcome bumps the consecutive-failure counter and asks
//!   the recovery policy what to do: lightweight retry (stay `Ready`),
//!   exponential backoff (`WaitRecover`), or permanent `Crashed`. The branch
//!   is chosen on the failure count *before* this crash, so with defaults
//!   the schedule is three lightweight retries, three backoff retries, then
//!   permanent.
//! - A non-fatal failure (`Fail`) returns to `Ready` without touching the
//!   counter: not every error is a lifecycle event.
//! - The watcher gate opens on the **first transition out of `InitRun`**
//!   into any non-terminal state, whatever the outcome class; the machine
//!   never returns to `InitRun`, so a recoverable init crash must not leave
//!   registered watchers parked.
//! - A `RecoveryTimeout` arriving in `Ready` (lightweight retry) or
//!   `WaitRecover` (backoff retry) emits the synthetic retry trigger; one
//!   arriving in `Running` is a benign race with a user-triggered run and is
//!   swallowed without a fault.
//!
//! ## Fault entries
//! Any signal not covered by a transition row yields `fault = true` and an
//! unchanged machine; the supervisor loop records it in the state-fault log.

use crate::policies::{RecoveryDecision, RecoveryPolicy};
use crate::signals::{Outcome, Signal, SignalKind};
use crate::state::effect::Effect;
use crate::state::lifecycle::Lifecycle;

/// The compact machine state the reducer operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Machine {
    /// Current lifecycle state.
    pub lifecycle: Lifecycle,
    /// Crash-class failures since the last clean return.
    pub consecutive_failures: u32,
}

impl Machine {
    /// A freshly constructed machine: `NotRun`, zero failures.
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::NotRun,
            consecutive_failures: 0,
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The machine after this signal.
    pub next: Machine,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
    /// True when the signal was rejected (impossible in this state).
    pub fault: bool,
}

impl Step {
    fn to(next: Machine, effects: Vec<Effect>) -> Self {
        Self {
            next,
            effects,
            fault: false,
        }
    }

    fn stay(machine: &Machine) -> Self {
        Self {
            next: *machine,
            effects: Vec::new(),
            fault: false,
        }
    }

    fn fault(machine: &Machine) -> Self {
        Self {
            next: *machine,
            effects: Vec::new(),
            fault: true,
        }
    }
}

/// Computes the next state and effects for one signal.
pub fn reduce(machine: &Machine, signal: &Signal, recovery: &RecoveryPolicy) -> Step {
    if machine.lifecycle.is_terminal() {
        return Step::fault(machine);
    }

    match machine.lifecycle {
        Lifecycle::NotRun => reduce_not_run(machine, signal),
        Lifecycle::InitRun => reduce_executing(machine, signal, recovery, true),
        Lifecycle::Ready => reduce_ready(machine, signal, recovery),
        Lifecycle::Running => reduce_executing(machine, signal, recovery, false),
        Lifecycle::WaitRecover => reduce_wait_recover(machine, signal, recovery),
        // Terminal states handled above.
        Lifecycle::Stopped | Lifecycle::Killed | Lifecycle::Crashed => Step::fault(machine),
    }
}

fn reduce_not_run(machine: &Machine, signal: &Signal) -> Step {
    match &signal.kind {
        SignalKind::InitRun => Step::to(
            Machine {
                lifecycle: Lifecycle::InitRun,
                consecutive_failures: machine.consecutive_failures,
            },
            vec![Effect::RunManaged {
                message: None,
                watcher: None,
                first: true,
            }],
        ),
        SignalKind::Stop => stop_step(machine),
        SignalKind::Kill => kill_step(machine),
        _ => Step::fault(machine),
    }
}

/// `InitRun` and `Running` share their rows: both have one invocation in
/// flight. The difference is the watcher gate: the first transition out of
/// `InitRun` into any non-terminal state carries `StartWatchers`.
fn reduce_executing(machine: &Machine, signal: &Signal, recovery: &RecoveryPolicy, init: bool) -> Step {
    match &signal.kind {
        SignalKind::ManagedDone { outcome } => match outcome {
            Outcome::Ok => {
                let mut effects = Vec::new();
                if init {
                    effects.push(Effect::StartWatchers);
                }
                Step::to(
                    Machine {
                        lifecycle: Lifecycle::Ready,
                        consecutive_failures: 0,
                    },
                    effects,
                )
            }
            Outcome::Stop { .. } => stop_step(machine),
            Outcome::Kill { .. } => kill_step(machine),
            Outcome::Crash { .. } => crash_step(machine, recovery, init),
            Outcome::Fail { .. } => {
                // Non-fatal: back to Ready. An init-run failure still
                // completes initialization, so parked watchers start.
                let mut effects = Vec::new();
                if init {
                    effects.push(Effect::StartWatchers);
                }
                Step::to(
                    Machine {
                        lifecycle: Lifecycle::Ready,
                        consecutive_failures: machine.consecutive_failures,
                    },
                    effects,
                )
            }
        },
        SignalKind::Stop => stop_step(machine),
        SignalKind::Kill => kill_step(machine),
        SignalKind::Crash => crash_step(machine, recovery, init),
        // A retry timer armed before this run became redundant; swallow it.
        SignalKind::RecoveryTimeout => Step::stay(machine),
        _ => Step::fault(machine),
    }
}

fn reduce_ready(machine: &Machine, signal: &Signal, recovery: &RecoveryPolicy) -> Step {
    match &signal.kind {
        SignalKind::UserMessage { content } => Step::to(
            Machine {
                lifecycle: Lifecycle::Running,
                consecutive_failures: machine.consecutive_failures,
            },
            vec![Effect::RunManaged {
                message: Some(content.clone()),
                watcher: None,
                first: false,
            }],
        ),
        SignalKind::ReactiveChange { watcher } => Step::to(
            Machine {
                lifecycle: Lifecycle::Running,
                consecutive_failures: machine.consecutive_failures,
            },
            vec![Effect::RunManaged {
                message: None,
                watcher: Some(watcher.clone()),
                first: false,
            }],
        ),
        SignalKind::RetryTrigger => Step::to(
            Machine {
                lifecycle: Lifecycle::Running,
                consecutive_failures: machine.consecutive_failures,
            },
            vec![Effect::RunManaged {
                message: None,
                watcher: None,
                first: false,
            }],
        ),
        // Lightweight retry: the timer fired while we are operational; rearm
        // execution through the reactive class so user traffic keeps its
        // place in line.
        SignalKind::RecoveryTimeout => Step::to(*machine, vec![Effect::EmitRetryTrigger]),
        SignalKind::Stop => stop_step(machine),
        SignalKind::Kill => kill_step(machine),
        SignalKind::Crash => crash_step(machine, recovery, false),
        _ => Step::fault(machine),
    }
}

fn reduce_wait_recover(machine: &Machine, signal: &Signal, recovery: &RecoveryPolicy) -> Step {
    match &signal.kind {
        SignalKind::RecoveryTimeout => Step::to(
            Machine {
                lifecycle: Lifecycle::Ready,
                consecutive_failures: machine.consecutive_failures,
            },
            vec![Effect::EmitRetryTrigger],
        ),
        SignalKind::Stop => stop_step(machine),
        SignalKind::Kill => kill_step(machine),
        SignalKind::Crash => crash_step(machine, recovery, false),
        _ => Step::fault(machine),
    }
}

fn stop_step(machine: &Machine) -> Step {
    Step::to(
        Machine {
            lifecycle: Lifecycle::Stopped,
            consecutive_failures: machine.consecutive_failures,
        },
        vec![Effect::RunCleanup, Effect::CloseWatchers],
    )
}

fn kill_step(machine: &Machine) -> Step {
    // The abort path: cleanup is intentionally skipped.
    Step::to(
        Machine {
            lifecycle: Lifecycle::Killed,
            consecutive_failures: machine.consecutive_failures,
        },
        vec![Effect::CloseWatchers],
    )
}

/// `init` marks a crash leaving `InitRun`: the machine never returns there,
/// so a recoverable init crash must still open the watcher gate — otherwise
/// every watcher registered during the init run would stay parked for the
/// whole session.
fn crash_step(machine: &Machine, recovery: &RecoveryPolicy, init: bool) -> Step {
    let failures_before = machine.consecutive_failures;
    let counted = failures_before.saturating_add(1);

    let recovering_effects = |delay| {
        let mut effects = Vec::new();
        if init {
            effects.push(Effect::StartWatchers);
        }
        effects.push(Effect::RunCleanup);
        effects.push(Effect::ScheduleRetry { delay });
        effects
    };

    match recovery.decide(failures_before) {
        RecoveryDecision::Lightweight(delay) => Step::to(
            Machine {
                lifecycle: Lifecycle::Ready,
                consecutive_failures: counted,
            },
            recovering_effects(delay),
        ),
        RecoveryDecision::Backoff(delay) => Step::to(
            Machine {
                lifecycle: Lifecycle::WaitRecover,
                consecutive_failures: counted,
            },
            recovering_effects(delay),
        ),
        RecoveryDecision::Permanent => Step::to(
            Machine {
                lifecycle: Lifecycle::Crashed,
                consecutive_failures: counted,
            },
            vec![Effect::RunCleanup, Effect::CloseWatchers],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recovery() -> RecoveryPolicy {
        RecoveryPolicy {
            min_failures: 3,
            max_failures: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            lightweight_delays: vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
            ],
            jitter: crate::policies::JitterPolicy::None,
        }
    }

    fn at(lifecycle: Lifecycle, failures: u32) -> Machine {
        Machine {
            lifecycle,
            consecutive_failures: failures,
        }
    }

    fn done(outcome: Outcome) -> Signal {
        Signal::new(SignalKind::ManagedDone { outcome })
    }

    #[test]
    fn repeated_reduction_is_identical() {
        let m = at(Lifecycle::Running, 2);
        let sig = done(Outcome::Crash {
            reason: "x".into(),
        });
        let r = recovery();
        let first = reduce(&m, &sig, &r);
        for _ in 0..10 {
            assert_eq!(reduce(&m, &sig, &r), first);
        }
    }

    #[test]
    fn init_flow_starts_watchers_on_first_success() {
        let r = recovery();
        let step = reduce(&Machine::new(), &Signal::new(SignalKind::InitRun), &r);
        assert_eq!(step.next.lifecycle, Lifecycle::InitRun);
        assert_eq!(
            step.effects,
            vec![Effect::RunManaged {
                message: None,
                watcher: None,
                first: true
            }]
        );

        let step = reduce(&step.next, &done(Outcome::Ok), &r);
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(step.effects, vec![Effect::StartWatchers]);
    }

    #[test]
    fn ready_triggers_run_with_the_right_provenance() {
        let r = recovery();
        let ready = at(Lifecycle::Ready, 0);

        let step = reduce(
            &ready,
            &Signal::new(SignalKind::UserMessage {
                content: "hello".into(),
            }),
            &r,
        );
        assert_eq!(step.next.lifecycle, Lifecycle::Running);
        assert_eq!(
            step.effects,
            vec![Effect::RunManaged {
                message: Some("hello".into()),
                watcher: None,
                first: false
            }]
        );

        let step = reduce(
            &ready,
            &Signal::new(SignalKind::ReactiveChange {
                watcher: "price".into(),
            }),
            &r,
        );
        assert_eq!(
            step.effects,
            vec![Effect::RunManaged {
                message: None,
                watcher: Some("price".into()),
                first: false
            }]
        );
    }

    #[test]
    fn clean_return_resets_failure_counter() {
        let r = recovery();
        let step = reduce(&at(Lifecycle::Running, 4), &done(Outcome::Ok), &r);
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(step.next.consecutive_failures, 0);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn non_fatal_failure_returns_to_ready_without_counting() {
        let r = recovery();
        let step = reduce(
            &at(Lifecycle::Running, 2),
            &done(Outcome::Fail {
                reason: "flaky".into(),
            }),
            &r,
        );
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(step.next.consecutive_failures, 2);
        assert!(!step.fault);
    }

    #[test]
    fn stop_runs_cleanup_and_kill_skips_it() {
        let r = recovery();
        let stop = reduce(
            &at(Lifecycle::Running, 0),
            &done(Outcome::Stop {
                reason: "bye".into(),
            }),
            &r,
        );
        assert_eq!(stop.next.lifecycle, Lifecycle::Stopped);
        assert_eq!(stop.effects, vec![Effect::RunCleanup, Effect::CloseWatchers]);

        let kill = reduce(
            &at(Lifecycle::Running, 0),
            &done(Outcome::Kill {
                reason: "abort".into(),
            }),
            &r,
        );
        assert_eq!(kill.next.lifecycle, Lifecycle::Killed);
        assert_eq!(kill.effects, vec![Effect::CloseWatchers]);
    }

    #[test]
    fn crash_schedule_walks_lightweight_then_backoff_then_permanent() {
        let r = recovery();
        let crash = |failures| {
            reduce(
                &at(Lifecycle::Running, failures),
                &done(Outcome::Crash {
                    reason: "x".into(),
                }),
                &r,
            )
        };

        // Three lightweight retries (stay Ready).
        for (before, delay_ms) in [(0, 100), (1, 200), (2, 300)] {
            let step = crash(before);
            assert_eq!(step.next.lifecycle, Lifecycle::Ready);
            assert_eq!(step.next.consecutive_failures, before + 1);
            assert_eq!(
                step.effects,
                vec![
                    Effect::RunCleanup,
                    Effect::ScheduleRetry {
                        delay: Duration::from_millis(delay_ms)
                    }
                ]
            );
        }

        // Three exponential retries (WaitRecover).
        for (before, delay_s) in [(3, 1), (4, 2), (5, 4)] {
            let step = crash(before);
            assert_eq!(step.next.lifecycle, Lifecycle::WaitRecover);
            assert_eq!(
                step.effects,
                vec![
                    Effect::RunCleanup,
                    Effect::ScheduleRetry {
                        delay: Duration::from_secs(delay_s)
                    }
                ]
            );
        }

        // The failure after the last backoff retry is permanent.
        let step = crash(6);
        assert_eq!(step.next.lifecycle, Lifecycle::Crashed);
        assert_eq!(step.effects, vec![Effect::RunCleanup, Effect::CloseWatchers]);
    }

    #[test]
    fn init_crash_participates_in_the_counter() {
        let r = recovery();
        let step = reduce(
            &at(Lifecycle::InitRun, 0),
            &done(Outcome::Crash {
                reason: "cold start".into(),
            }),
            &r,
        );
        assert_eq!(step.next.consecutive_failures, 1);
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
    }

    #[test]
    fn recoverable_init_crash_still_opens_the_watcher_gate() {
        // The machine never returns to InitRun, so the gate must open on the
        // first transition out of it even when that transition is a crash.
        let r = recovery();
        let crash = done(Outcome::Crash {
            reason: "cold start".into(),
        });

        // Lightweight branch (failures_before < min).
        let step = reduce(&at(Lifecycle::InitRun, 0), &crash, &r);
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(
            step.effects,
            vec![
                Effect::StartWatchers,
                Effect::RunCleanup,
                Effect::ScheduleRetry {
                    delay: Duration::from_millis(100)
                }
            ]
        );

        // Backoff branch (min <= failures_before < max).
        let step = reduce(&at(Lifecycle::InitRun, 3), &crash, &r);
        assert_eq!(step.next.lifecycle, Lifecycle::WaitRecover);
        assert_eq!(
            step.effects,
            vec![
                Effect::StartWatchers,
                Effect::RunCleanup,
                Effect::ScheduleRetry {
                    delay: Duration::from_secs(1)
                }
            ]
        );

        // A crash from Running never re-emits the gate effect.
        let step = reduce(&at(Lifecycle::Running, 0), &crash, &r);
        assert_eq!(
            step.effects,
            vec![
                Effect::RunCleanup,
                Effect::ScheduleRetry {
                    delay: Duration::from_millis(100)
                }
            ]
        );

        // Permanent init crash closes watchers instead of starting them.
        let step = reduce(&at(Lifecycle::InitRun, 6), &crash, &r);
        assert_eq!(step.next.lifecycle, Lifecycle::Crashed);
        assert_eq!(step.effects, vec![Effect::RunCleanup, Effect::CloseWatchers]);
    }

    #[test]
    fn recovery_timeout_rearms_in_ready_and_wait_recover() {
        let r = recovery();
        let step = reduce(
            &at(Lifecycle::Ready, 1),
            &Signal::new(SignalKind::RecoveryTimeout),
            &r,
        );
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(step.effects, vec![Effect::EmitRetryTrigger]);

        let step = reduce(
            &at(Lifecycle::WaitRecover, 4),
            &Signal::new(SignalKind::RecoveryTimeout),
            &r,
        );
        assert_eq!(step.next.lifecycle, Lifecycle::Ready);
        assert_eq!(step.effects, vec![Effect::EmitRetryTrigger]);
    }

    #[test]
    fn recovery_timeout_during_running_is_swallowed() {
        let r = recovery();
        let m = at(Lifecycle::Running, 1);
        let step = reduce(&m, &Signal::new(SignalKind::RecoveryTimeout), &r);
        assert_eq!(step.next, m);
        assert!(step.effects.is_empty());
        assert!(!step.fault);
    }

    #[test]
    fn terminal_states_are_sticky() {
        let r = recovery();
        for lifecycle in [Lifecycle::Stopped, Lifecycle::Killed, Lifecycle::Crashed] {
            let m = at(lifecycle, 3);
            for sig in [
                Signal::new(SignalKind::InitRun),
                Signal::new(SignalKind::UserMessage {
                    content: "late".into(),
                }),
                Signal::new(SignalKind::RecoveryTimeout),
                done(Outcome::Ok),
            ] {
                let step = reduce(&m, &sig, &r);
                assert_eq!(step.next, m);
                assert!(step.fault);
                assert!(step.effects.is_empty());
            }
        }
    }

    #[test]
    fn impossible_signals_fault_without_transition() {
        let r = recovery();
        let m = at(Lifecycle::Ready, 0);
        let step = reduce(&m, &done(Outcome::Ok), &r);
        assert!(step.fault);
        assert_eq!(step.next, m);

        let m = Machine::new();
        let step = reduce(
            &m,
            &Signal::new(SignalKind::UserMessage {
                content: "too early".into(),
            }),
            &r,
        );
        assert!(step.fault);
    }
}
