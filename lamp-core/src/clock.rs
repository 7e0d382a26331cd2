//! Millisecond clock shared by every periodic task.
//!
//! The counter is a fixed-width `u32` that wraps roughly every 49.7 days.
//! Elapsed time is always computed with wrapping subtraction, which yields the
//! correct distance between two readings as long as they are less than one
//! full wrap apart.

use core::fmt;

/// Monotonic millisecond reading that wraps at `u32::MAX`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    /// Reading taken at boot.
    pub const ZERO: Self = Self(0);

    /// Largest representable reading; the next millisecond wraps to zero.
    pub const MAX: Self = Self(u32::MAX);

    /// Wraps a raw millisecond counter.
    #[must_use]
    pub const fn from_millis(value: u32) -> Self {
        Self(value)
    }

    /// Builds a reading from a 64-bit uptime, keeping the low 32 bits.
    ///
    /// Truncation is the same wraparound a 32-bit hardware counter exhibits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_uptime(millis: u64) -> Self {
        Self(millis as u32)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, modulo 2^32.
    #[must_use]
    pub const fn wrapping_since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Returns `true` once at least `interval_ms` have passed since `earlier`.
    #[must_use]
    pub const fn has_elapsed(self, earlier: Millis, interval_ms: u32) -> bool {
        self.wrapping_since(earlier) >= interval_ms
    }

    /// Advances the reading by `delta_ms`, wrapping at the counter width.
    #[must_use]
    pub const fn wrapping_add(self, delta_ms: u32) -> Self {
        Self(self.0.wrapping_add(delta_ms))
    }
}

impl From<u32> for Millis {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Read-only source of [`Millis`] readings.
pub trait Clock {
    /// Returns the current reading.
    fn now(&self) -> Millis;
}

/// Clock that only moves when told to. Used by host tooling and tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct ManualClock {
    now: Millis,
}

impl ManualClock {
    /// Creates a clock that starts at `start`.
    #[must_use]
    pub const fn starting_at(start: Millis) -> Self {
        Self { now: start }
    }

    /// Moves the clock forward by `delta_ms`, wrapping at the counter width.
    pub fn advance(&mut self, delta_ms: u32) -> Millis {
        self.now = self.now.wrapping_add(delta_ms);
        self.now
    }

    /// Jumps the clock to an absolute reading.
    pub fn set(&mut self, now: Millis) {
        self.now = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_wraparound() {
        let earlier = Millis::from_millis(u32::MAX - 1);
        let now = Millis::from_millis(1);
        assert_eq!(now.wrapping_since(earlier), 3);
        assert!(!now.has_elapsed(earlier, 5));
        assert!(now.has_elapsed(earlier, 3));
    }

    #[test]
    fn uptime_truncates_to_counter_width() {
        let reading = Millis::from_uptime(u64::from(u32::MAX) + 11);
        assert_eq!(reading.as_millis(), 10);
    }

    #[test]
    fn manual_clock_wraps() {
        let mut clock = ManualClock::starting_at(Millis::MAX);
        assert_eq!(clock.advance(2), Millis::from_millis(1));
        clock.set(Millis::from_millis(40));
        assert_eq!(clock.now().as_millis(), 40);
    }
}
