//! Button debouncing and one-shot press events.
//!
//! [`Debouncer`] filters a raw boolean line into a stable level. [`Button`]
//! layers the wiring polarity and a [`PressLatch`] on top so that each
//! physical press yields exactly one consumable press event.

use crate::clock::Millis;

/// Window a new raw level has to respect before it is accepted.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u32 = 50;

/// Input collaborator sampled on demand.
pub trait ButtonInput {
    /// Returns `true` when the line reads high.
    fn is_high(&mut self) -> bool;
}

/// Direction of a confirmed level change.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    const fn towards(level: bool) -> Self {
        if level { Edge::Rising } else { Edge::Falling }
    }
}

/// Confirmed change of the stable level.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DebounceEvent {
    pub level: bool,
    pub edge: Edge,
    pub at: Millis,
}

/// Single-sample confirm debouncer.
///
/// A differing raw sample is accepted as soon as the window has elapsed since
/// the last accepted change; samples arriving inside the window are ignored.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Debouncer {
    stable: bool,
    last_change: Millis,
    window_ms: u32,
}

impl Debouncer {
    /// Creates a debouncer whose stable level starts at `initial`.
    #[must_use]
    pub const fn new(initial: bool, window_ms: u32) -> Self {
        Self {
            stable: initial,
            last_change: Millis::ZERO,
            window_ms,
        }
    }

    /// Feeds one raw sample.
    pub fn sample(&mut self, raw: bool, now: Millis) -> Option<DebounceEvent> {
        if raw == self.stable || !now.has_elapsed(self.last_change, self.window_ms) {
            return None;
        }

        self.stable = raw;
        self.last_change = now;
        Some(DebounceEvent {
            level: raw,
            edge: Edge::towards(raw),
            at: now,
        })
    }

    #[must_use]
    pub const fn stable(&self) -> bool {
        self.stable
    }

    #[must_use]
    pub const fn last_change(&self) -> Millis {
        self.last_change
    }

    #[must_use]
    pub const fn window_ms(&self) -> u32 {
        self.window_ms
    }
}

/// Line level that means "pressed".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ButtonPolarity {
    /// Pull-up wiring: the switch shorts the line to ground.
    #[default]
    ActiveLow,
    /// Pull-down wiring: the switch ties the line to the supply.
    ActiveHigh,
}

impl ButtonPolarity {
    /// Returns `true` when `level` means pressed.
    #[must_use]
    pub const fn is_pressed(self, level: bool) -> bool {
        match self {
            ButtonPolarity::ActiveLow => !level,
            ButtonPolarity::ActiveHigh => level,
        }
    }

    /// Raw level read while the switch is open.
    #[must_use]
    pub const fn released_level(self) -> bool {
        matches!(self, ButtonPolarity::ActiveLow)
    }
}

/// How raw samples become press events.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DebouncePolicy {
    /// Accept any change once the window since the last change has elapsed.
    /// Both presses and releases re-arm the filter.
    #[default]
    Rearming,
    /// Accept a press only after the line stayed pressed for a full window,
    /// then ignore the line until it reads released again.
    HoldConfirm,
}

/// Debounced edge in button terms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// One-shot press flag: raised by the sampler, consumed by one reader.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PressLatch {
    pending: bool,
    dropped: u32,
}

impl PressLatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: false,
            dropped: 0,
        }
    }

    /// Raises the flag. A press raised while the previous one is still
    /// pending is merged into it and counted as dropped.
    pub fn raise(&mut self) -> bool {
        if self.pending {
            self.dropped = self.dropped.saturating_add(1);
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Consumes the flag, returning whether a press was pending.
    pub fn take(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Presses merged into an undrained one.
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct HoldGate {
    pressed_since: Option<Millis>,
    awaiting_release: bool,
}

impl HoldGate {
    const fn new() -> Self {
        Self {
            pressed_since: None,
            awaiting_release: false,
        }
    }

    fn sample(&mut self, pressed: bool, now: Millis, window_ms: u32) -> Option<ButtonEdge> {
        if !pressed {
            self.pressed_since = None;
            if self.awaiting_release {
                self.awaiting_release = false;
                return Some(ButtonEdge::Released);
            }
            return None;
        }

        if self.awaiting_release {
            return None;
        }

        match self.pressed_since {
            None => {
                self.pressed_since = Some(now);
                None
            }
            Some(since) if now.has_elapsed(since, window_ms) => {
                self.pressed_since = None;
                self.awaiting_release = true;
                Some(ButtonEdge::Pressed)
            }
            Some(_) => None,
        }
    }
}

/// Debounced push button with a one-shot press latch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Button {
    polarity: ButtonPolarity,
    policy: DebouncePolicy,
    debouncer: Debouncer,
    gate: HoldGate,
    latch: PressLatch,
    presses: u32,
}

impl Button {
    /// Creates a released button using the re-arming policy.
    #[must_use]
    pub const fn new(polarity: ButtonPolarity, window_ms: u32) -> Self {
        Self::with_policy(polarity, DebouncePolicy::Rearming, window_ms)
    }

    #[must_use]
    pub const fn with_policy(
        polarity: ButtonPolarity,
        policy: DebouncePolicy,
        window_ms: u32,
    ) -> Self {
        Self {
            polarity,
            policy,
            debouncer: Debouncer::new(polarity.released_level(), window_ms),
            gate: HoldGate::new(),
            latch: PressLatch::new(),
            presses: 0,
        }
    }

    /// Feeds one raw line sample and raises the latch on a confirmed press.
    pub fn sample(&mut self, raw: bool, now: Millis) -> Option<ButtonEdge> {
        let edge = match self.policy {
            DebouncePolicy::Rearming => self.debouncer.sample(raw, now).map(|event| {
                if self.polarity.is_pressed(event.level) {
                    ButtonEdge::Pressed
                } else {
                    ButtonEdge::Released
                }
            }),
            DebouncePolicy::HoldConfirm => {
                let pressed = self.polarity.is_pressed(raw);
                self.gate
                    .sample(pressed, now, self.debouncer.window_ms())
            }
        };

        if edge == Some(ButtonEdge::Pressed) {
            self.presses = self.presses.wrapping_add(1);
            self.latch.raise();
        }

        edge
    }

    /// Reads the input collaborator and feeds the sample.
    pub fn poll<I: ButtonInput>(&mut self, input: &mut I, now: Millis) -> Option<ButtonEdge> {
        let raw = input.is_high();
        self.sample(raw, now)
    }

    /// Injects a press that did not come from the line (e.g. a console
    /// request). It travels through the same latch as physical presses.
    pub fn raise_press(&mut self) -> bool {
        self.latch.raise()
    }

    /// Consumes the pending press, if any.
    pub fn take_press(&mut self) -> bool {
        self.latch.take()
    }

    /// Current debounced state in button terms.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        match self.policy {
            DebouncePolicy::Rearming => self.polarity.is_pressed(self.debouncer.stable()),
            DebouncePolicy::HoldConfirm => self.gate.awaiting_release,
        }
    }

    /// Physical presses confirmed since boot.
    #[must_use]
    pub const fn presses(&self) -> u32 {
        self.presses
    }

    #[must_use]
    pub const fn latch(&self) -> &PressLatch {
        &self.latch
    }

    #[must_use]
    pub const fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    #[must_use]
    pub const fn polarity(&self) -> ButtonPolarity {
        self.polarity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u32) -> Millis {
        Millis::from_millis(value)
    }

    #[test]
    fn confirms_after_window_and_reports_edge() {
        let mut debouncer = Debouncer::new(true, DEFAULT_DEBOUNCE_WINDOW_MS);
        assert_eq!(debouncer.sample(false, ms(10)), None);

        let event = debouncer.sample(false, ms(50)).expect("edge expected");
        assert_eq!(event.edge, Edge::Falling);
        assert!(!event.level);
        assert_eq!(debouncer.last_change(), ms(50));

        assert_eq!(debouncer.sample(true, ms(99)), None);
        let event = debouncer.sample(true, ms(100)).expect("edge expected");
        assert_eq!(event.edge, Edge::Rising);
    }

    #[test]
    fn unchanged_level_never_emits() {
        let mut debouncer = Debouncer::new(false, 50);
        for t in (0..1_000).step_by(7) {
            assert_eq!(debouncer.sample(false, ms(t)), None);
        }
    }

    #[test]
    fn active_low_button_maps_levels() {
        let mut button = Button::new(ButtonPolarity::ActiveLow, 50);
        assert!(!button.is_pressed());
        assert_eq!(button.sample(false, ms(60)), Some(ButtonEdge::Pressed));
        assert!(button.is_pressed());
        assert_eq!(button.sample(true, ms(120)), Some(ButtonEdge::Released));
        assert_eq!(button.presses(), 1);
    }

    #[test]
    fn latch_is_consumed_once() {
        let mut button = Button::new(ButtonPolarity::ActiveHigh, 50);
        button.sample(true, ms(50));
        assert!(button.take_press());
        assert!(!button.take_press());
    }

    #[test]
    fn undrained_press_is_counted_as_dropped() {
        let mut latch = PressLatch::new();
        assert!(latch.raise());
        assert!(!latch.raise());
        assert_eq!(latch.dropped(), 1);
        assert!(latch.take());
        assert!(!latch.is_pending());
    }

    #[test]
    fn hold_confirm_waits_for_hold_then_release() {
        let mut button =
            Button::with_policy(ButtonPolarity::ActiveLow, DebouncePolicy::HoldConfirm, 50);

        assert_eq!(button.sample(false, ms(1_000)), None);
        // Bounce back open restarts the hold.
        assert_eq!(button.sample(true, ms(1_010)), None);
        assert_eq!(button.sample(false, ms(1_020)), None);
        assert_eq!(button.sample(false, ms(1_069)), None);
        assert_eq!(button.sample(false, ms(1_070)), Some(ButtonEdge::Pressed));

        // Held down: no further presses however long it stays closed.
        assert_eq!(button.sample(false, ms(5_000)), None);
        assert!(button.is_pressed());

        assert_eq!(button.sample(true, ms(5_001)), Some(ButtonEdge::Released));
        assert!(button.take_press());
        assert!(!button.take_press());
    }

    struct FixedLine(bool);

    impl ButtonInput for FixedLine {
        fn is_high(&mut self) -> bool {
            self.0
        }
    }

    #[test]
    fn poll_reads_collaborator() {
        let mut button = Button::new(ButtonPolarity::ActiveLow, 50);
        let mut line = FixedLine(false);
        assert_eq!(button.poll(&mut line, ms(75)), Some(ButtonEdge::Pressed));
    }
}
