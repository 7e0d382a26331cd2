#![no_std]

//! Cooperative lamp controller shared by the firmware and host tooling.
//!
//! Periodic tasks run to completion from a single [`scheduler::Scheduler`],
//! gated by wrap-safe elapsed-time checks on a `u32` millisecond clock. A
//! debounced button feeds a three-state lamp machine (off, on, blink) whose
//! per-tick output drives a gamma-corrected PWM duty, and an optional analog
//! sensor is smoothed by a fixed-point moving average. The crate avoids the
//! standard library and never allocates.

pub mod app;
pub mod clock;
pub mod console;
pub mod debounce;
pub mod filter;
pub mod fsm;
pub mod output;
pub mod scheduler;
pub mod telemetry;
pub mod timer;

pub use app::{LampApp, LampConfig, LampContext, build, build_with_sensor};
pub use clock::{Clock, ManualClock, Millis};
