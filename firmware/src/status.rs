#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The lamp task owns the scheduler; it publishes a [`LampStatus`] into these
//! atomics after every tick so the console can answer `status` without
//! reaching into the task.

use lamp_core::Millis;
use lamp_core::console::LampStatus;
use lamp_core::fsm::LampState;
use lamp_core::output::Brightness;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

static STATE: AtomicU8 = AtomicU8::new(LampState::Off.code());
static LEVEL: AtomicBool = AtomicBool::new(false);
static DUTY: AtomicU8 = AtomicU8::new(0);
static BRIGHTNESS: AtomicU8 = AtomicU8::new(Brightness::MAX.percent());
static BUTTON_PRESSED: AtomicBool = AtomicBool::new(false);
/// Set while a press sits in the latch waiting for the lamp task.
static PRESS_PENDING: AtomicBool = AtomicBool::new(false);
static PRESSES: AtomicU32 = AtomicU32::new(0);
static DROPPED: AtomicU32 = AtomicU32::new(0);
static TRANSITIONS: AtomicU32 = AtomicU32::new(0);
static UPTIME_MS: AtomicU32 = AtomicU32::new(0);
static SENSOR_VALID: AtomicBool = AtomicBool::new(false);
static SENSOR: AtomicU16 = AtomicU16::new(0);
static SENSOR_SAMPLES: AtomicU32 = AtomicU32::new(0);

/// Stores the latest snapshot produced by the lamp task.
pub fn publish(status: &LampStatus, press_pending: bool) {
    STATE.store(status.state.code(), Ordering::Relaxed);
    LEVEL.store(status.level, Ordering::Relaxed);
    DUTY.store(status.duty, Ordering::Relaxed);
    BRIGHTNESS.store(status.brightness.percent(), Ordering::Relaxed);
    BUTTON_PRESSED.store(status.button_pressed, Ordering::Relaxed);
    PRESS_PENDING.store(press_pending, Ordering::Relaxed);
    PRESSES.store(status.presses, Ordering::Relaxed);
    DROPPED.store(status.dropped, Ordering::Relaxed);
    TRANSITIONS.store(status.transitions, Ordering::Relaxed);
    UPTIME_MS.store(status.now.as_millis(), Ordering::Relaxed);
    SENSOR.store(status.sensor.unwrap_or(0), Ordering::Relaxed);
    SENSOR_VALID.store(status.sensor.is_some(), Ordering::Relaxed);
    SENSOR_SAMPLES.store(status.sensor_samples, Ordering::Relaxed);
}

/// Marks a console press as in flight before the lamp task has seen it.
pub fn mark_press_pending() -> bool {
    !PRESS_PENDING.swap(true, Ordering::Relaxed)
}

#[cfg(test)]
pub fn press_pending() -> bool {
    PRESS_PENDING.load(Ordering::Relaxed)
}

/// Rebuilds a [`LampStatus`] from the stored values.
pub fn snapshot() -> LampStatus {
    LampStatus {
        now: Millis::from_millis(UPTIME_MS.load(Ordering::Relaxed)),
        state: LampState::from_code(STATE.load(Ordering::Relaxed)).unwrap_or_default(),
        level: LEVEL.load(Ordering::Relaxed),
        duty: DUTY.load(Ordering::Relaxed),
        brightness: Brightness::new(BRIGHTNESS.load(Ordering::Relaxed)),
        button_pressed: BUTTON_PRESSED.load(Ordering::Relaxed),
        presses: PRESSES.load(Ordering::Relaxed),
        dropped: DROPPED.load(Ordering::Relaxed),
        transitions: TRANSITIONS.load(Ordering::Relaxed),
        sensor: SENSOR_VALID
            .load(Ordering::Relaxed)
            .then(|| SENSOR.load(Ordering::Relaxed)),
        sensor_samples: SENSOR_SAMPLES.load(Ordering::Relaxed),
    }
}
