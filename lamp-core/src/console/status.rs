//! Shared status surface for the console.
//!
//! The firmware and emulator both build a [`LampStatus`] and hand it to
//! [`StatusFormatter`] so the `status` command renders the same way on every
//! front-end.

use core::fmt;

use crate::clock::Millis;
use crate::fsm::LampState;
use crate::output::Brightness;

/// Snapshot of the lamp controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LampStatus {
    pub now: Millis,
    pub state: LampState,
    pub level: bool,
    pub duty: u8,
    pub brightness: Brightness,
    pub button_pressed: bool,
    pub presses: u32,
    pub dropped: u32,
    pub transitions: u32,
    /// Filtered sensor value; `None` until the first reading.
    pub sensor: Option<u16>,
    pub sensor_samples: u32,
}

impl LampStatus {
    /// Snapshot of a freshly booted controller.
    #[must_use]
    pub const fn boot() -> Self {
        Self {
            now: Millis::ZERO,
            state: LampState::Off,
            level: false,
            duty: 0,
            brightness: Brightness::MAX,
            button_pressed: false,
            presses: 0,
            dropped: 0,
            transitions: 0,
            sensor: None,
            sensor_samples: 0,
        }
    }
}

/// Renders a [`LampStatus`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    status: &'a LampStatus,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(status: &'a LampStatus) -> Self {
        Self { status }
    }

    /// Writes the lamp line (e.g. `lamp state=blink output=high duty=255 brightness=100%`).
    pub fn write_lamp_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "lamp state={} output={} duty={} brightness={}%",
            self.status.state,
            level_name(self.status.level),
            self.status.duty,
            self.status.brightness.percent()
        )
    }

    /// Writes the input line (e.g. `button pressed=false presses=3 dropped=0`).
    pub fn write_button_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "button pressed={} presses={} dropped={} transitions={} uptime={}",
            self.status.button_pressed,
            self.status.presses,
            self.status.dropped,
            self.status.transitions,
            self.status.now
        )
    }

    /// Writes the sensor line, or nothing before the first reading.
    pub fn write_sensor_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        match self.status.sensor {
            Some(filtered) => write!(
                writer,
                "sensor filtered={filtered} samples={}",
                self.status.sensor_samples
            ),
            None => Ok(()),
        }
    }
}

impl fmt::Display for StatusFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_lamp_line(f)?;
        f.write_str("\n")?;
        self.write_button_line(f)?;
        if self.status.sensor.is_some() {
            f.write_str("\n")?;
            self.write_sensor_line(f)?;
        }
        Ok(())
    }
}

const fn level_name(level: bool) -> &'static str {
    if level { "high" } else { "low" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    #[test]
    fn renders_lamp_and_button_lines() {
        let status = LampStatus {
            now: Millis::from_millis(1_234),
            state: LampState::Blink,
            level: true,
            duty: 255,
            presses: 3,
            transitions: 2,
            ..LampStatus::boot()
        };

        let mut text = heapless::String::<160>::new();
        write!(text, "{}", StatusFormatter::new(&status)).unwrap();
        assert_eq!(
            text.as_str(),
            "lamp state=blink output=high duty=255 brightness=100%\n\
             button pressed=false presses=3 dropped=0 transitions=2 uptime=1234ms"
        );
    }

    #[test]
    fn sensor_line_follows_first_reading() {
        let status = LampStatus {
            sensor: Some(2_048),
            sensor_samples: 7,
            ..LampStatus::boot()
        };

        let mut text = heapless::String::<200>::new();
        write!(text, "{}", StatusFormatter::new(&status)).unwrap();
        assert_eq!(
            text.lines().next_back(),
            Some("sensor filtered=2048 samples=7")
        );
        assert_eq!(text.lines().count(), 3);
    }
}
