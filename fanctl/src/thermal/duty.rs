use std::fmt;

/// PWM duty cycle on a 0..=255 scale, where 255 means always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DutyCycle(u8);

impl DutyCycle {
    pub const OFF: Self = Self(0);
    pub const MAX: Self = Self(u8::MAX);

    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Duty as a percentage of full scale, for display.
    pub fn percent(self) -> f64 {
        f64::from(self.0) * 100.0 / f64::from(u8::MAX)
    }

    /// High time within one PWM period of `period_ns` nanoseconds.
    pub fn pulse_width_ns(self, period_ns: u64) -> u64 {
        period_ns * u64::from(self.0) / u64::from(u8::MAX)
    }

    /// Scale a fraction of full speed to a duty, rounding to the nearest
    /// step (halves round up). Out-of-range fractions saturate.
    pub(crate) fn from_fraction(fraction: f64) -> Self {
        let scaled = (fraction * f64::from(u8::MAX)).round();
        Self(scaled.clamp(0.0, f64::from(u8::MAX)) as u8)
    }
}

impl From<u8> for DutyCycle {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<DutyCycle> for u8 {
    fn from(duty: DutyCycle) -> Self {
        duty.0
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/255", self.0)
    }
}
