//! Three-state lamp machine driven by debounced presses.

use core::fmt;

use crate::clock::Millis;
use crate::timer::TaskTimer;

/// Default half-period of the blink pattern.
pub const DEFAULT_BLINK_INTERVAL_MS: u32 = 500;

/// Lamp mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum LampState {
    #[default]
    Off,
    On,
    Blink,
}

impl LampState {
    /// Every state in cycle order.
    pub const ALL: [LampState; 3] = [LampState::Off, LampState::On, LampState::Blink];

    /// State reached by one press.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            LampState::Off => LampState::On,
            LampState::On => LampState::Blink,
            LampState::Blink => LampState::Off,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LampState::Off => "off",
            LampState::On => "on",
            LampState::Blink => "blink",
        }
    }

    /// Compact code used by telemetry payloads.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            LampState::Off => 0,
            LampState::On => 1,
            LampState::Blink => 2,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LampState::Off),
            1 => Some(LampState::On),
            2 => Some(LampState::Blink),
            _ => None,
        }
    }
}

impl fmt::Display for LampState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs the machine reacts to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LampEvent {
    Press,
    Release,
}

/// Pure transition table: presses advance the cycle, anything else is ignored.
#[must_use]
pub const fn transition(state: LampState, event: LampEvent) -> LampState {
    match event {
        LampEvent::Press => state.next(),
        LampEvent::Release => state,
    }
}

/// Applied state change.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: LampState,
    pub to: LampState,
}

/// Lamp machine with its blink sub-timer.
///
/// The blink level and timer are kept across mode changes, so re-entering
/// [`LampState::Blink`] resumes the pattern where it left off.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LampMachine {
    state: LampState,
    blink_timer: TaskTimer,
    blink_level: bool,
    transitions: u32,
}

impl LampMachine {
    #[must_use]
    pub const fn new(blink_interval_ms: u32) -> Self {
        Self {
            state: LampState::Off,
            blink_timer: TaskTimer::new(blink_interval_ms),
            blink_level: false,
            transitions: 0,
        }
    }

    /// Applies an event, returning the transition when the state changed.
    pub fn handle(&mut self, event: LampEvent) -> Option<Transition> {
        let from = self.state;
        let to = transition(from, event);
        if from == to {
            return None;
        }
        self.state = to;
        self.transitions = self.transitions.wrapping_add(1);
        Some(Transition { from, to })
    }

    /// Per-tick action. Returns the level the lamp should show.
    pub fn step(&mut self, now: Millis) -> bool {
        match self.state {
            LampState::Off => false,
            LampState::On => true,
            LampState::Blink => {
                if self.blink_timer.poll(now) {
                    self.blink_level = !self.blink_level;
                }
                self.blink_level
            }
        }
    }

    /// Level implied by the current state without advancing the blink timer.
    #[must_use]
    pub const fn output(&self) -> bool {
        match self.state {
            LampState::Off => false,
            LampState::On => true,
            LampState::Blink => self.blink_level,
        }
    }

    #[must_use]
    pub const fn state(&self) -> LampState {
        self.state
    }

    /// Changes applied since boot.
    #[must_use]
    pub const fn transitions(&self) -> u32 {
        self.transitions
    }

    #[must_use]
    pub const fn blink_interval_ms(&self) -> u32 {
        self.blink_timer.interval_ms()
    }

    pub fn set_blink_interval(&mut self, interval_ms: u32) {
        self.blink_timer.set_interval(interval_ms);
    }
}

impl Default for LampMachine {
    fn default() -> Self {
        Self::new(DEFAULT_BLINK_INTERVAL_MS)
    }
}
