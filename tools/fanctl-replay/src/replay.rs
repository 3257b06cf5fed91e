//! Feeds a trace through a [`FanController`] and records every decision.

use fanctl::thermal::{Band, DutyCycle, FanController, FanState};

use crate::trace::Sample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayStep {
    pub sample: Sample,
    pub band: Band,
    pub state: FanState,
    pub duty: DutyCycle,
    /// Whether the daemon would have written this duty to the PWM device.
    pub write: bool,
    pub state_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub samples: usize,
    pub writes: usize,
    pub transitions: usize,
    /// Time spent at full speed, counting each sample until the next one.
    pub full_speed_s: f64,
    pub max_temperature_c: Option<f64>,
}

pub fn replay(controller: &mut FanController, samples: &[Sample]) -> Vec<ReplayStep> {
    samples
        .iter()
        .map(|&sample| {
            let previous = controller.state();
            let duty = controller.evaluate(sample.temperature_c);
            let state = controller.state();

            ReplayStep {
                sample,
                band: controller.band(),
                state,
                duty,
                write: controller.should_apply(),
                state_changed: state != previous,
            }
        })
        .collect()
}

pub fn summarize(steps: &[ReplayStep]) -> Summary {
    let full_speed_s = steps
        .windows(2)
        .filter(|pair| pair[0].state == FanState::FullSpeed)
        .map(|pair| pair[1].sample.elapsed_s - pair[0].sample.elapsed_s)
        .sum();

    Summary {
        samples: steps.len(),
        writes: steps.iter().filter(|step| step.write).count(),
        transitions: steps.iter().filter(|step| step.state_changed).count(),
        full_speed_s,
        max_temperature_c: steps
            .iter()
            .map(|step| step.sample.temperature_c)
            .reduce(f64::max),
    }
}
