use strum::Display;

use super::duty::DutyCycle;

/// Externally visible fan state, derived from the hysteresis flag and the
/// last commanded duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FanState {
    /// Cooling disengaged, duty 0.
    Idle,
    /// Cooling engaged somewhere on the ramp, including its 0 start.
    Ramping,
    /// Cooling engaged at maximum duty.
    FullSpeed,
}

impl FanState {
    pub fn from_output(running: bool, duty: DutyCycle) -> Self {
        match (running, duty) {
            (false, _) => FanState::Idle,
            (true, DutyCycle::MAX) => FanState::FullSpeed,
            (true, _) => FanState::Ramping,
        }
    }
}
