//! Line console shared between firmware and emulator targets.
//!
//! The grammar lives in [`grammar`] and is driven by the static command
//! [`catalog`]. [`commands`] dispatches parsed lines into a platform
//! [`LampControl`](commands::LampControl) implementation.

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod status;

pub use commands::{ConsoleError, ConsoleExecutor, ConsoleOutcome, LampControl};
pub use status::{LampStatus, StatusFormatter};
