use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Cooling engages from idle at or above this temperature (°C).
    pub temp_on: f64,

    /// Cooling disengages at or below this temperature (°C). Must be lower
    /// than `temp_on`; the gap between the two is the hysteresis dead band.
    pub temp_off: f64,

    /// Duty is pinned at maximum at or above this temperature (°C). Must be
    /// higher than `temp_on`, since the ramp spans `temp_on..full_speed_temp`.
    pub full_speed_temp: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            temp_on: 55.0,
            temp_off: 50.0,
            full_speed_temp: 70.0,
        }
    }
}

/// Threshold ordering violated. The message names the broken invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidConfig {
    #[error("{name} must be a finite temperature, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("temp_off ({temp_off}) must be less than temp_on ({temp_on})")]
    OffNotBelowOn { temp_off: f64, temp_on: f64 },

    #[error("temp_on ({temp_on}) must be less than full_speed_temp ({full_speed_temp})")]
    OnNotBelowFullSpeed { temp_on: f64, full_speed_temp: f64 },
}

impl ControllerConfig {
    /// Check `temp_off < temp_on < full_speed_temp`.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        for (name, value) in [
            ("temp_on", self.temp_on),
            ("temp_off", self.temp_off),
            ("full_speed_temp", self.full_speed_temp),
        ] {
            if !value.is_finite() {
                return Err(InvalidConfig::NonFinite { name, value });
            }
        }

        if self.temp_off >= self.temp_on {
            return Err(InvalidConfig::OffNotBelowOn {
                temp_off: self.temp_off,
                temp_on: self.temp_on,
            });
        }

        if self.temp_on >= self.full_speed_temp {
            return Err(InvalidConfig::OnNotBelowFullSpeed {
                temp_on: self.temp_on,
                full_speed_temp: self.full_speed_temp,
            });
        }

        Ok(())
    }

    /// Width of the linear ramp in °C. Positive once validated.
    pub(super) fn ramp_span_c(&self) -> f64 {
        self.full_speed_temp - self.temp_on
    }
}
