//! Per-task elapsed-time gate.

use crate::clock::Millis;

/// Smallest interval a timer accepts.
///
/// A zero interval would let a task run twice for the same clock reading.
pub const MIN_INTERVAL_MS: u32 = 1;

/// Tracks when a periodic action last ran and how often it may run.
///
/// The timer never accumulates missed periods: when it fires, `last_run`
/// jumps to the current reading instead of advancing by one interval.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaskTimer {
    last_run: Millis,
    interval_ms: u32,
}

impl TaskTimer {
    /// Creates a timer that last ran at boot.
    #[must_use]
    pub const fn new(interval_ms: u32) -> Self {
        Self::starting_at(Millis::ZERO, interval_ms)
    }

    /// Creates a timer with an explicit last-run reading.
    #[must_use]
    pub const fn starting_at(last_run: Millis, interval_ms: u32) -> Self {
        Self {
            last_run,
            interval_ms: clamp_interval(interval_ms),
        }
    }

    /// Returns `true` when the interval has elapsed since the last run.
    #[must_use]
    pub const fn is_due(&self, now: Millis) -> bool {
        now.has_elapsed(self.last_run, self.interval_ms)
    }

    /// Fires the timer if it is due, recording `now` as the last run.
    pub fn poll(&mut self, now: Millis) -> bool {
        if self.is_due(now) {
            self.last_run = now;
            true
        } else {
            false
        }
    }

    /// Restarts the period from `now` without firing.
    pub fn restart(&mut self, now: Millis) {
        self.last_run = now;
    }

    /// Changes the interval; the current period keeps its start reading.
    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = clamp_interval(interval_ms);
    }

    #[must_use]
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    #[must_use]
    pub const fn last_run(&self) -> Millis {
        self.last_run
    }
}

const fn clamp_interval(interval_ms: u32) -> u32 {
    if interval_ms < MIN_INTERVAL_MS {
        MIN_INTERVAL_MS
    } else {
        interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval_without_catch_up() {
        let mut timer = TaskTimer::new(100);
        assert!(!timer.poll(Millis::from_millis(99)));
        assert!(timer.poll(Millis::from_millis(100)));
        assert!(!timer.poll(Millis::from_millis(150)));

        // A late poll moves the period start to the late reading.
        assert!(timer.poll(Millis::from_millis(450)));
        assert_eq!(timer.last_run(), Millis::from_millis(450));
        assert!(!timer.poll(Millis::from_millis(500)));
        assert!(timer.poll(Millis::from_millis(550)));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut timer = TaskTimer::new(0);
        assert_eq!(timer.interval_ms(), MIN_INTERVAL_MS);
        assert!(timer.poll(Millis::from_millis(1)));
        assert!(!timer.poll(Millis::from_millis(1)));
    }

    #[test]
    fn restart_defers_next_run() {
        let mut timer = TaskTimer::new(10);
        timer.restart(Millis::from_millis(25));
        assert!(!timer.is_due(Millis::from_millis(34)));
        assert!(timer.is_due(Millis::from_millis(35)));
    }

    #[test]
    fn due_check_across_wrap() {
        let timer = TaskTimer::starting_at(Millis::from_millis(u32::MAX - 1), 5);
        assert!(!timer.is_due(Millis::from_millis(1)));
        assert!(timer.is_due(Millis::from_millis(3)));
    }
}
