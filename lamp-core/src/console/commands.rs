//! Console command dispatcher.
//!
//! Parsed commands are routed to a platform [`LampControl`] implementation.
//! The firmware forwards them over a channel to the task that owns the
//! scheduler; the emulator applies them directly to its simulated board.

use core::fmt;
use core::time::Duration;

use crate::clock::Millis;
use crate::output::Brightness;

use super::catalog::{self, CommandSpec};
use super::grammar::{self, ButtonAction, Command};
use super::status::{LampStatus, StatusFormatter};

/// Platform hooks the console drives.
pub trait LampControl {
    /// Queues a press through the same one-shot path a physical press uses.
    /// Returns `false` when it merged into a press that was still pending,
    /// and an error when the press could not be handed over at all.
    fn press(&mut self) -> Result<bool, ConsoleError<'static>>;

    /// Applies a brightness, returning the previous value.
    fn set_brightness(&mut self, brightness: Brightness)
    -> Result<Brightness, ConsoleError<'static>>;

    fn status(&mut self) -> LampStatus;

    /// Drives the raw button line. Only simulated boards support it.
    fn drive_button(&mut self, _pressed: bool) -> Result<(), ConsoleError<'static>> {
        Err(ConsoleError::Unsupported("button"))
    }

    /// Moves the clock forward. Only simulated boards support it.
    fn advance(&mut self, _by: Duration) -> Result<Millis, ConsoleError<'static>> {
        Err(ConsoleError::Unsupported("advance"))
    }
}

/// Command execution successes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleOutcome {
    Pressed { queued: bool },
    Button { pressed: bool },
    Advanced { now: Millis },
    Brightness { from: Brightness, to: Brightness },
    Status(LampStatus),
    /// `None` lists every command.
    Help(Option<&'static CommandSpec>),
}

impl fmt::Display for ConsoleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleOutcome::Pressed { queued: true } => f.write_str("ok press queued"),
            ConsoleOutcome::Pressed { queued: false } => {
                f.write_str("ok press merged into pending press")
            }
            ConsoleOutcome::Button { pressed } => {
                write!(f, "ok button {}", if *pressed { "down" } else { "up" })
            }
            ConsoleOutcome::Advanced { now } => write!(f, "ok now={now}"),
            ConsoleOutcome::Brightness { from, to } => write!(
                f,
                "ok brightness {}% -> {}%",
                from.percent(),
                to.percent()
            ),
            ConsoleOutcome::Status(status) => write!(f, "{}", StatusFormatter::new(status)),
            ConsoleOutcome::Help(Some(spec)) => {
                write!(f, "usage: {}\n  {}", spec.usage, spec.summary)
            }
            ConsoleOutcome::Help(None) => {
                f.write_str("commands:")?;
                for spec in catalog::commands() {
                    write!(f, "\n  {:<20} {}", spec.usage, spec.summary)?;
                }
                Ok(())
            }
        }
    }
}

/// Errors surfaced while executing a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleError<'a> {
    Parse(grammar::ParseError<'a>),
    Unsupported(&'static str),
    /// The request was not accepted; nothing changed.
    QueueFull(&'static str),
    OutOfRange {
        what: &'static str,
        value: u32,
        max: u32,
    },
}

impl<'a> From<grammar::ParseError<'a>> for ConsoleError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl fmt::Display for ConsoleError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Parse(err) => write!(f, "error: {err}"),
            ConsoleError::Unsupported(what) => write!(f, "error: {what} is not supported here"),
            ConsoleError::QueueFull(what) => {
                write!(f, "error: request queue full, {what} not applied")
            }
            ConsoleError::OutOfRange { what, value, max } => {
                write!(f, "error: {what} {value} out of range (0-{max})")
            }
        }
    }
}

pub type ConsoleResult<'a> = Result<ConsoleOutcome, ConsoleError<'a>>;

/// Dispatches console lines into a [`LampControl`].
pub struct ConsoleExecutor<C> {
    control: C,
}

impl<C> ConsoleExecutor<C> {
    pub const fn new(control: C) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut C {
        &mut self.control
    }

    pub fn into_inner(self) -> C {
        self.control
    }
}

impl<C> ConsoleExecutor<C>
where
    C: LampControl,
{
    /// Parses and executes a console line.
    pub fn execute<'a>(&mut self, line: &'a str) -> ConsoleResult<'a> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    fn dispatch<'a>(&mut self, command: Command<'a>) -> ConsoleResult<'a> {
        match command {
            Command::Press => Ok(ConsoleOutcome::Pressed {
                queued: self.control.press()?,
            }),
            Command::Button(action) => {
                let pressed = action == ButtonAction::Down;
                self.control.drive_button(pressed)?;
                Ok(ConsoleOutcome::Button { pressed })
            }
            Command::Advance(by) => {
                let now = self.control.advance(by)?;
                Ok(ConsoleOutcome::Advanced { now })
            }
            Command::Brightness(percent) => {
                let to = Brightness::checked(percent).ok_or(ConsoleError::OutOfRange {
                    what: "brightness",
                    value: percent,
                    max: u32::from(Brightness::MAX.percent()),
                })?;
                let from = self.control.set_brightness(to)?;
                Ok(ConsoleOutcome::Brightness { from, to })
            }
            Command::Status => Ok(ConsoleOutcome::Status(self.control.status())),
            Command::Help(help) => match help.topic {
                None => Ok(ConsoleOutcome::Help(None)),
                Some(topic) => catalog::find(topic)
                    .map(|spec| ConsoleOutcome::Help(Some(spec)))
                    .ok_or(ConsoleError::Unsupported("help topic")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::catalog::CommandTag;

    struct MockControl {
        pending: bool,
        brightness: Brightness,
        presses: u32,
        full: bool,
    }

    impl MockControl {
        fn new() -> Self {
            Self {
                pending: false,
                brightness: Brightness::MAX,
                presses: 0,
                full: false,
            }
        }
    }

    impl LampControl for MockControl {
        fn press(&mut self) -> Result<bool, ConsoleError<'static>> {
            if self.full {
                return Err(ConsoleError::QueueFull("press"));
            }
            self.presses += 1;
            Ok(!core::mem::replace(&mut self.pending, true))
        }

        fn set_brightness(
            &mut self,
            brightness: Brightness,
        ) -> Result<Brightness, ConsoleError<'static>> {
            if self.full {
                return Err(ConsoleError::QueueFull("brightness"));
            }
            Ok(core::mem::replace(&mut self.brightness, brightness))
        }

        fn status(&mut self) -> LampStatus {
            LampStatus {
                brightness: self.brightness,
                presses: self.presses,
                ..LampStatus::boot()
            }
        }
    }

    #[test]
    fn press_reports_merge() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        assert_eq!(
            executor.execute("press"),
            Ok(ConsoleOutcome::Pressed { queued: true })
        );
        assert_eq!(
            executor.execute("press"),
            Ok(ConsoleOutcome::Pressed { queued: false })
        );
        assert_eq!(executor.control().presses, 2);
    }

    #[test]
    fn rejected_requests_are_errors() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        executor.control_mut().full = true;

        let err = executor.execute("press").unwrap_err();
        assert_eq!(err, ConsoleError::QueueFull("press"));
        let mut text = heapless::String::<64>::new();
        core::fmt::write(&mut text, format_args!("{err}")).unwrap();
        assert_eq!(text.as_str(), "error: request queue full, press not applied");

        assert_eq!(
            executor.execute("brightness 10"),
            Err(ConsoleError::QueueFull("brightness"))
        );
        assert_eq!(executor.control().presses, 0);
        assert_eq!(executor.control().brightness, Brightness::MAX);
    }

    #[test]
    fn brightness_is_range_checked() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        assert_eq!(
            executor.execute("brightness 101"),
            Err(ConsoleError::OutOfRange {
                what: "brightness",
                value: 101,
                max: 100
            })
        );
        assert_eq!(executor.control().brightness, Brightness::MAX);

        assert_eq!(
            executor.execute("brightness 30"),
            Ok(ConsoleOutcome::Brightness {
                from: Brightness::MAX,
                to: Brightness::new(30)
            })
        );
    }

    #[test]
    fn hardware_rejects_simulation_commands() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        assert_eq!(
            executor.execute("advance 10ms"),
            Err(ConsoleError::Unsupported("advance"))
        );
        assert_eq!(
            executor.execute("button down"),
            Err(ConsoleError::Unsupported("button"))
        );
    }

    #[test]
    fn status_goes_through_control() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        executor.execute("press").unwrap();
        match executor.execute("status") {
            Ok(ConsoleOutcome::Status(status)) => assert_eq!(status.presses, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn help_resolves_topics() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        match executor.execute("help brightness") {
            Ok(ConsoleOutcome::Help(Some(spec))) => assert_eq!(spec.tag, CommandTag::Brightness),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(executor.execute("help"), Ok(ConsoleOutcome::Help(None)));
        assert_eq!(
            executor.execute("help nothing"),
            Err(ConsoleError::Unsupported("help topic"))
        );
    }

    #[test]
    fn parse_error_is_returned() {
        let mut executor = ConsoleExecutor::new(MockControl::new());
        assert!(matches!(
            executor.execute("press later please"),
            Err(ConsoleError::Parse(_))
        ));
    }
}
