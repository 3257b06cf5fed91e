use strum::Display;

use super::config::{ControllerConfig, InvalidConfig};
use super::duty::DutyCycle;
use super::state::FanState;

/// Which threshold band the most recent reading fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Band {
    /// At or above `full_speed_temp`.
    FullSpeed,
    /// From `temp_on` up to `full_speed_temp`.
    Ramp,
    /// At or below `temp_off`.
    Off,
    /// Between `temp_off` and `temp_on`, or a non-finite reading. Nothing
    /// changes here.
    DeadBand,
}

/// Hysteresis fan controller with a linear speed ramp.
///
/// Owns no I/O: each call to [`evaluate`](Self::evaluate) maps a temperature
/// and the controller's history to a duty cycle. One instance per cooling
/// zone.
///
/// Bands, checked in this order:
///
/// - **`t >= full_speed_temp`:** duty 255, cooling engaged.
/// - **`t >= temp_on`:** duty ramps linearly from 0 at `temp_on` to 255 at
///   `full_speed_temp`, cooling engaged.
/// - **`t <= temp_off`:** duty 0, cooling disengaged.
/// - **Dead band:** anything else. Duty and the engaged flag are kept, so
///   once on the fan stays on until `temp_off`, and once off it stays off
///   until `temp_on`.
#[derive(Debug, Clone)]
pub struct FanController {
    config: ControllerConfig,
    running: bool,
    duty: DutyCycle,
    band: Band,
}

impl FanController {
    pub fn new(config: ControllerConfig) -> Result<Self, InvalidConfig> {
        config.validate()?;

        Ok(Self {
            config,
            running: false,
            duty: DutyCycle::OFF,
            band: Band::DeadBand,
        })
    }

    /// Compute the duty for `temperature` (°C) and update the hysteresis
    /// state.
    ///
    /// Never fails. A non-finite reading is treated like a dead-band reading:
    /// state and duty are held.
    pub fn evaluate(&mut self, temperature: f64) -> DutyCycle {
        let config = &self.config;

        if !temperature.is_finite() {
            self.band = Band::DeadBand;
        } else if temperature >= config.full_speed_temp {
            self.band = Band::FullSpeed;
            self.duty = DutyCycle::MAX;
            self.running = true;
        } else if temperature >= config.temp_on {
            self.band = Band::Ramp;
            self.duty = self.ramp(temperature);
            self.running = true;
        } else if temperature <= config.temp_off {
            self.band = Band::Off;
            self.duty = DutyCycle::OFF;
            self.running = false;
        } else {
            self.band = Band::DeadBand;
        }

        self.duty
    }

    fn ramp(&self, temperature: f64) -> DutyCycle {
        let fraction = (temperature - self.config.temp_on) / self.config.ramp_span_c();
        DutyCycle::from_fraction(fraction)
    }

    /// Whether the last evaluated duty has to be written to the actuator.
    ///
    /// Writes happen whenever cooling is engaged or the duty was just driven
    /// to 0. A dead-band reading while idle needs no write.
    pub fn should_apply(&self) -> bool {
        match self.band {
            Band::DeadBand => self.running,
            Band::FullSpeed | Band::Ramp | Band::Off => true,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn duty(&self) -> DutyCycle {
        self.duty
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn state(&self) -> FanState {
        FanState::from_output(self.running, self.duty)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn create_controller() -> FanController {
        FanController::new(ControllerConfig::default()).unwrap()
    }

    #[test]
    fn should_start_idle() {
        let controller = create_controller();

        assert!(!controller.running());
        assert_eq!(controller.duty(), DutyCycle::OFF);
        assert_eq!(controller.state(), FanState::Idle);
    }

    #[test]
    fn should_reject_invalid_config() {
        let config = ControllerConfig {
            temp_on: 50.0,
            temp_off: 55.0,
            full_speed_temp: 70.0,
        };

        let err = FanController::new(config).unwrap_err();
        assert!(matches!(err, InvalidConfig::OffNotBelowOn { .. }));
    }

    #[test]
    fn should_follow_reference_scenario() {
        let mut controller = create_controller();

        assert_eq!(controller.evaluate(45.0), DutyCycle::OFF);
        assert_eq!(controller.state(), FanState::Idle);

        assert_eq!(controller.evaluate(55.0), DutyCycle::OFF);
        assert_eq!(controller.state(), FanState::Ramping);
        assert!(controller.running());

        assert_eq!(controller.evaluate(62.5), DutyCycle::new(128));
        assert_eq!(controller.state(), FanState::Ramping);

        assert_eq!(controller.evaluate(70.0), DutyCycle::MAX);
        assert_eq!(controller.state(), FanState::FullSpeed);

        assert_eq!(controller.evaluate(52.0), DutyCycle::MAX);
        assert!(controller.running());
        assert_eq!(controller.state(), FanState::FullSpeed);

        assert_eq!(controller.evaluate(49.0), DutyCycle::OFF);
        assert!(!controller.running());
        assert_eq!(controller.state(), FanState::Idle);
    }

    #[test_case(70.0 ; "at threshold")]
    #[test_case(70.01 ; "just above")]
    #[test_case(120.0 ; "far above")]
    fn should_run_full_speed_at_or_above_threshold(temperature: f64) {
        let mut controller = create_controller();

        assert_eq!(controller.evaluate(temperature), DutyCycle::MAX);
        assert!(controller.running());
    }

    #[test]
    fn should_start_ramp_at_zero_duty() {
        let mut controller = create_controller();

        assert_eq!(controller.evaluate(55.0), DutyCycle::OFF);
        assert!(controller.running());
    }

    #[test]
    fn should_stop_at_off_threshold() {
        let mut controller = create_controller();
        controller.evaluate(65.0);

        assert_eq!(controller.evaluate(50.0), DutyCycle::OFF);
        assert!(!controller.running());
    }

    #[test]
    fn should_stay_idle_in_dead_band_when_idle() {
        let mut controller = create_controller();

        assert_eq!(controller.evaluate(52.0), DutyCycle::OFF);
        assert_eq!(controller.state(), FanState::Idle);
        assert_eq!(controller.evaluate(54.99), DutyCycle::OFF);
        assert_eq!(controller.state(), FanState::Idle);
    }

    #[test]
    fn should_hold_ramp_duty_in_dead_band() {
        let mut controller = create_controller();
        let duty = controller.evaluate(60.0);

        assert_eq!(controller.evaluate(53.0), duty);
        assert_eq!(controller.evaluate(50.01), duty);
        assert!(controller.running());
        assert_eq!(controller.state(), FanState::Ramping);
    }

    #[test]
    fn should_round_ramp_duty_to_nearest_step() {
        let mut controller = create_controller();

        // 255 * 1 / 15 = 17.0
        assert_eq!(controller.evaluate(56.0), DutyCycle::new(17));
        // 255 * 0.1 / 15 = 1.7, truncation would give 1
        assert_eq!(controller.evaluate(55.1), DutyCycle::new(2));
        // 255 * 0.02 / 15 = 0.34
        assert_eq!(controller.evaluate(55.02), DutyCycle::OFF);
    }

    #[test]
    fn should_not_decrease_duty_along_ramp() {
        let mut controller = create_controller();
        let mut previous = DutyCycle::OFF;

        for step in 0..=1500 {
            let temperature = 55.0 + f64::from(step) * 0.01;
            let duty = controller.evaluate(temperature);
            assert!(
                duty >= previous,
                "duty fell from {previous} to {duty} at {temperature} °C"
            );
            previous = duty;
        }

        assert_eq!(previous, DutyCycle::MAX);
    }

    #[test_case(57.3 ; "ramp")]
    #[test_case(80.0 ; "full speed")]
    fn should_be_idempotent_under_constant_input(temperature: f64) {
        let mut controller = create_controller();
        let first = controller.evaluate(temperature);

        for _ in 0..10 {
            assert_eq!(controller.evaluate(temperature), first);
        }
    }

    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "positive infinity")]
    #[test_case(f64::NEG_INFINITY ; "negative infinity")]
    fn should_hold_state_on_non_finite_reading(temperature: f64) {
        let mut controller = create_controller();
        let duty = controller.evaluate(63.0);

        assert_eq!(controller.evaluate(temperature), duty);
        assert!(controller.running());
        assert_eq!(controller.band(), Band::DeadBand);
    }

    #[test]
    fn should_apply_when_running_or_stopping() {
        let mut controller = create_controller();

        controller.evaluate(60.0);
        assert!(controller.should_apply());

        controller.evaluate(52.0);
        assert!(controller.should_apply());

        controller.evaluate(45.0);
        assert!(controller.should_apply());
    }

    #[test]
    fn should_skip_write_in_dead_band_when_never_engaged() {
        let mut controller = create_controller();

        controller.evaluate(52.0);
        assert!(!controller.should_apply());
    }

    #[test]
    fn should_skip_write_for_non_finite_reading_while_idle() {
        let mut controller = create_controller();

        controller.evaluate(f64::NAN);
        assert!(!controller.should_apply());
        assert_eq!(controller.state(), FanState::Idle);
    }

    #[test]
    fn should_scale_ramp_for_custom_band() {
        let config = ControllerConfig {
            temp_on: 40.0,
            temp_off: 35.0,
            full_speed_temp: 50.0,
        };
        let mut controller = FanController::new(config).unwrap();

        assert_eq!(controller.evaluate(45.0), DutyCycle::new(128));
        assert_eq!(controller.evaluate(48.0), DutyCycle::new(204));
    }

    #[test]
    fn should_keep_instances_independent() {
        let mut first = create_controller();
        let mut second = create_controller();

        first.evaluate(75.0);
        second.evaluate(52.0);

        assert_eq!(first.state(), FanState::FullSpeed);
        assert_eq!(second.state(), FanState::Idle);
    }
}
