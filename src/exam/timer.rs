//! Per-question countdown
//!
//! The countdown is cooperative: it only advances when the owner feeds it
//! a tick, and every tick carries the generation it was scheduled for so
//! ticks that outlive a pause or a reset are recognised and dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::timer::TICK_MILLIS;

/// Lifecycle of a single question's countdown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    /// Reset to the full budget, waiting for the proctor to start it
    #[default]
    Ready,
    /// Counting down
    Running,
    /// Suspended by the proctor
    Paused,
    /// Stopped before reaching zero because the answer was revealed
    Stopped,
    /// Reached zero
    Expired,
}

/// Notable moment produced by a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Countdown {
    /// Time remains and no threshold was crossed
    Continue,
    /// The first warning threshold was reached
    Warning,
    /// The critical threshold was reached
    Critical,
    /// The countdown reached zero
    TimeUp,
}

/// Countdown for the question on screen
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionTimer {
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    budget: Duration,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    remaining: Duration,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    warning_at: Duration,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    critical_at: Duration,
    state: TimerState,
    generation: u64,
}

impl QuestionTimer {
    /// Creates a ready timer with the given budget and notice thresholds
    pub fn new(budget: Duration, warning_at: Duration, critical_at: Duration) -> Self {
        Self {
            budget,
            remaining: budget,
            warning_at,
            critical_at,
            state: TimerState::Ready,
            generation: 0,
        }
    }

    /// Interval between ticks
    pub fn tick_interval() -> Duration {
        Duration::from_millis(TICK_MILLIS)
    }

    /// Full budget for a question
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left on the clock
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Current lifecycle state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Generation that a tick must carry to be accepted
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn change_state(&mut self, before: TimerState, after: TimerState) -> bool {
        if self.state == before {
            self.state = after;
            true
        } else {
            false
        }
    }

    /// Restores the full budget and waits for a start
    pub fn reset(&mut self) {
        self.remaining = self.budget;
        self.state = TimerState::Ready;
        self.generation += 1;
    }

    /// Starts counting down from a reset
    ///
    /// # Returns
    ///
    /// `true` if the timer was ready and is now running
    pub fn start(&mut self) -> bool {
        self.change_state(TimerState::Ready, TimerState::Running)
    }

    /// Suspends the countdown, invalidating the pending tick
    pub fn pause(&mut self) -> bool {
        if self.change_state(TimerState::Running, TimerState::Paused) {
            self.generation += 1;
            true
        } else {
            false
        }
    }

    /// Continues a paused countdown
    pub fn resume(&mut self) -> bool {
        self.change_state(TimerState::Paused, TimerState::Running)
    }

    /// Freezes the clock where it is, used when the answer is revealed early
    pub fn stop(&mut self) {
        if matches!(
            self.state,
            TimerState::Ready | TimerState::Running | TimerState::Paused
        ) {
            self.state = TimerState::Stopped;
            self.generation += 1;
        }
    }

    /// Whether a tick scheduled for `generation` should be applied
    pub fn accepts(&self, generation: u64) -> bool {
        self.state == TimerState::Running && self.generation == generation
    }

    /// Advances the clock by one tick
    ///
    /// Ticks are ignored unless the timer is running.
    pub fn tick(&mut self) -> Option<Countdown> {
        if self.state != TimerState::Running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(Self::tick_interval());

        Some(if self.remaining.is_zero() {
            self.state = TimerState::Expired;
            self.generation += 1;
            Countdown::TimeUp
        } else if self.remaining == self.critical_at {
            Countdown::Critical
        } else if self.remaining == self.warning_at {
            Countdown::Warning
        } else {
            Countdown::Continue
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn timer(budget: u64) -> QuestionTimer {
        QuestionTimer::new(
            Duration::from_secs(budget),
            Duration::from_secs(5),
            Duration::from_secs(3),
        )
    }

    #[test]
    fn test_ticks_only_while_running() {
        let mut t = timer(10);
        assert_eq!(t.tick(), None);
        assert!(t.start());
        assert_eq!(t.tick(), Some(Countdown::Continue));
        assert_eq!(t.remaining(), Duration::from_secs(9));
        assert!(t.pause());
        assert_eq!(t.tick(), None);
        assert!(t.resume());
        assert_eq!(t.tick(), Some(Countdown::Continue));
        assert_eq!(t.remaining(), Duration::from_secs(8));
    }

    #[test]
    fn test_thresholds_and_expiry() {
        let mut t = timer(6);
        t.start();
        assert_eq!(t.tick(), Some(Countdown::Warning));
        assert_eq!(t.tick(), Some(Countdown::Continue));
        assert_eq!(t.tick(), Some(Countdown::Critical));
        assert_eq!(t.tick(), Some(Countdown::Continue));
        assert_eq!(t.tick(), Some(Countdown::Continue));
        assert_eq!(t.tick(), Some(Countdown::TimeUp));
        assert_eq!(t.state(), TimerState::Expired);
        assert_eq!(t.tick(), None);
    }

    #[test]
    fn test_generation_invalidates_stale_ticks() {
        let mut t = timer(10);
        t.start();
        let scheduled = t.generation();
        assert!(t.accepts(scheduled));

        t.pause();
        t.resume();
        assert!(!t.accepts(scheduled));
        assert!(t.accepts(t.generation()));

        let before_reset = t.generation();
        t.reset();
        assert!(!t.accepts(before_reset));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut t = timer(10);
        assert!(!t.pause());
        assert!(!t.resume());
        assert!(t.start());
        assert!(!t.start());
        t.stop();
        assert_eq!(t.state(), TimerState::Stopped);
        assert!(!t.resume());
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut t = timer(10);
        t.start();
        t.tick();
        t.stop();
        t.reset();
        assert_eq!(t.remaining(), Duration::from_secs(10));
        assert_eq!(t.state(), TimerState::Ready);
    }
}
