//! Analog sensor input and its smoothing filter.
//!
//! The `sensor` task reads a raw sample through [`SensorInput`] and folds it
//! into an exponential moving average kept in Q8 fixed point, so the crate
//! stays free of floating point on the target.

/// Fixed-point scale of the smoothing factor; `alpha = EMA_SCALE` disables
/// smoothing.
pub const EMA_SCALE: u16 = 256;

/// Smoothing factor of roughly 0.2, settling within a handful of samples.
pub const DEFAULT_EMA_ALPHA: u16 = 51;

/// Source of raw analog samples.
pub trait SensorInput {
    /// Returns the next raw sample, or `None` when no reading is available.
    fn read(&mut self) -> Option<u16>;
}

/// Stand-in for boards without an analog sensor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoSensor;

impl SensorInput for NoSensor {
    fn read(&mut self) -> Option<u16> {
        None
    }
}

/// Exponential moving average over `u16` samples.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ema {
    alpha: u16,
    value_q8: Option<u32>,
    samples: u32,
}

impl Ema {
    /// Creates a filter; `alpha` is clamped to `1..=EMA_SCALE`.
    #[must_use]
    pub const fn new(alpha: u16) -> Self {
        let alpha = if alpha == 0 {
            1
        } else if alpha > EMA_SCALE {
            EMA_SCALE
        } else {
            alpha
        };
        Self {
            alpha,
            value_q8: None,
            samples: 0,
        }
    }

    #[must_use]
    pub const fn alpha(&self) -> u16 {
        self.alpha
    }

    /// Folds in one sample and returns the rounded filtered value.
    ///
    /// The first sample seeds the average directly.
    pub fn update(&mut self, sample: u16) -> u16 {
        let target = u32::from(sample) << 8;
        let next = match self.value_q8 {
            None => target,
            Some(current) => {
                let alpha = u64::from(self.alpha);
                let keep = u64::from(EMA_SCALE - self.alpha);
                let mixed = u64::from(target) * alpha + u64::from(current) * keep + 128;
                // Both inputs fit in 24 bits, so the mix does too.
                u32::try_from(mixed >> 8).unwrap_or(u32::MAX)
            }
        };
        self.value_q8 = Some(next);
        self.samples = self.samples.wrapping_add(1);
        round_q8(next)
    }

    /// Filtered value, `None` before the first sample.
    #[must_use]
    pub fn value(&self) -> Option<u16> {
        self.value_q8.map(round_q8)
    }

    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    pub fn reset(&mut self) {
        self.value_q8 = None;
        self.samples = 0;
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self::new(DEFAULT_EMA_ALPHA)
    }
}

fn round_q8(value: u32) -> u16 {
    u16::try_from((value + 128) >> 8).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_average() {
        let mut ema = Ema::default();
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update(812), 812);
        assert_eq!(ema.samples(), 1);
    }

    #[test]
    fn step_moves_by_alpha() {
        let mut ema = Ema::default();
        ema.update(0);
        // 51/256 of the way towards 1000.
        assert_eq!(ema.update(1_000), 199);
    }

    #[test]
    fn converges_on_steady_input() {
        let mut ema = Ema::default();
        ema.update(0);
        let mut last = 0;
        for _ in 0..40 {
            let next = ema.update(1_000);
            assert!(next >= last);
            last = next;
        }
        assert_eq!(ema.value(), Some(1_000));
    }

    #[test]
    fn full_alpha_tracks_raw_samples() {
        let mut ema = Ema::new(EMA_SCALE);
        ema.update(10);
        assert_eq!(ema.update(4_095), 4_095);
        assert_eq!(Ema::new(0).alpha(), 1);
        assert_eq!(Ema::new(1_000).alpha(), EMA_SCALE);
    }

    #[test]
    fn extremes_do_not_overflow() {
        let mut ema = Ema::new(EMA_SCALE - 1);
        for _ in 0..8 {
            ema.update(u16::MAX);
        }
        assert_eq!(ema.value(), Some(u16::MAX));
    }
}
