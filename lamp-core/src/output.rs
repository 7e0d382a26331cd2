//! Lamp drive shaping: brightness, gamma correction, and output polarity.

/// Full-scale PWM duty.
pub const MAX_DUTY: u8 = u8::MAX;

/// `floor((p / 100)^2.2 * 255)` for `p` in `0..=100`.
pub const GAMMA_TABLE: [u8; 101] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 1, //
    1, 1, 2, 2, 3, 3, 4, 5, 5, 6, //
    7, 8, 9, 10, 11, 12, 13, 14, 15, 16, //
    18, 19, 20, 22, 23, 25, 26, 28, 30, 32, //
    33, 35, 37, 39, 41, 44, 46, 48, 50, 53, //
    55, 57, 60, 63, 65, 68, 71, 74, 76, 79, //
    82, 85, 89, 92, 95, 98, 102, 105, 109, 112, //
    116, 120, 123, 127, 131, 135, 139, 143, 147, 151, //
    156, 160, 164, 169, 173, 178, 182, 187, 192, 197, //
    202, 207, 212, 217, 222, 227, 233, 238, 243, 249, //
    255,
];

/// Perceived brightness in percent, always within `0..=100`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Brightness(u8);

impl Brightness {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    /// Clamps `percent` into range.
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        if percent > 100 {
            Self::MAX
        } else {
            Self(percent)
        }
    }

    /// Accepts only in-range values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn checked(percent: u32) -> Option<Self> {
        if percent > 100 {
            None
        } else {
            Some(Self(percent as u8))
        }
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

/// Gamma-corrected duty for a brightness.
#[must_use]
pub const fn gamma_duty(brightness: Brightness) -> u8 {
    GAMMA_TABLE[brightness.0 as usize]
}

/// Electrical sense of the lamp output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputPolarity {
    /// High duty lights the lamp.
    #[default]
    ActiveHigh,
    /// Sinking driver: low duty lights the lamp.
    ActiveLow,
}

impl OutputPolarity {
    #[must_use]
    pub const fn apply(self, duty: u8) -> u8 {
        match self {
            OutputPolarity::ActiveHigh => duty,
            OutputPolarity::ActiveLow => MAX_DUTY - duty,
        }
    }
}

/// Maps the machine's on/off level to a PWM duty.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LampDrive {
    pub brightness: Brightness,
    pub polarity: OutputPolarity,
}

impl LampDrive {
    #[must_use]
    pub const fn new(brightness: Brightness, polarity: OutputPolarity) -> Self {
        Self {
            brightness,
            polarity,
        }
    }

    /// Duty to write for a logical lamp level.
    #[must_use]
    pub const fn duty(&self, level: bool) -> u8 {
        let logical = if level { gamma_duty(self.brightness) } else { 0 };
        self.polarity.apply(logical)
    }
}

/// Output collaborator receiving the final duty.
pub trait LampOutput {
    fn set_duty(&mut self, duty: u8);
}

/// Output that discards every write.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLampOutput;

impl LampOutput for NoopLampOutput {
    fn set_duty(&mut self, _duty: u8) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_endpoints_and_monotonic() {
        assert_eq!(gamma_duty(Brightness::MIN), 0);
        assert_eq!(gamma_duty(Brightness::MAX), 255);
        assert_eq!(gamma_duty(Brightness::new(50)), 55);
        assert!(GAMMA_TABLE.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn brightness_clamps() {
        assert_eq!(Brightness::new(250), Brightness::MAX);
        assert_eq!(Brightness::checked(101), None);
        assert_eq!(Brightness::checked(42).map(Brightness::percent), Some(42));
    }

    #[test]
    fn active_low_inverts() {
        let drive = LampDrive::new(Brightness::MAX, OutputPolarity::ActiveLow);
        assert_eq!(drive.duty(true), 0);
        assert_eq!(drive.duty(false), 255);

        let dim = LampDrive::new(Brightness::new(20), OutputPolarity::ActiveHigh);
        assert_eq!(dim.duty(true), 7);
        assert_eq!(dim.duty(false), 0);
    }
}
