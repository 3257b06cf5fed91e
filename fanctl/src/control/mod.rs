//! Periodic sense -> evaluate -> actuate loop around a [`FanController`].
//!
//! One `ControlLoop` drives one cooling zone. It owns its controller, sensor
//! and actuator outright; zones that need independent control get
//! independent loops.

mod watchdog;

pub use watchdog::{SensorWatchdog, WatchdogStatus};

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::actuator::Actuator;
use crate::error::{Error, Result};
use crate::sensor::{SensorError, TemperatureSource};
use crate::thermal::{DutyCycle, FanController, FanState};
use crate::tracing::prelude::*;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

pub const DEFAULT_ALARM_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// PWM channel the fan is wired to.
    pub channel: u8,

    /// Time between samples.
    pub interval: Duration,

    /// Drive the fan to duty 0 and release the output when the loop is
    /// cancelled.
    pub stop_on_exit: bool,

    /// Give up after this many consecutive failed reads. `None` retries
    /// forever.
    pub max_read_failures: Option<u32>,

    /// How long reads must keep failing before an error is logged.
    pub alarm_after: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            channel: 0,
            interval: DEFAULT_INTERVAL,
            stop_on_exit: true,
            max_read_failures: None,
            alarm_after: DEFAULT_ALARM_AFTER,
        }
    }
}

/// Snapshot published after every iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanStatus {
    /// Most recent successful reading, if any.
    pub temperature_c: Option<f64>,
    pub duty: DutyCycle,
    pub state: FanState,
    pub consecutive_read_failures: u32,
}

impl Default for FanStatus {
    fn default() -> Self {
        Self {
            temperature_c: None,
            duty: DutyCycle::OFF,
            state: FanState::Idle,
            consecutive_read_failures: 0,
        }
    }
}

/// What a single iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Duty was written to the actuator.
    Applied(DutyCycle),
    /// Controller held an idle fan in the dead band; nothing was written.
    Held(DutyCycle),
    /// Sensor read failed; the cycle was skipped and the previous duty stands.
    ReadFailed,
    /// Actuator rejected the duty. The controller state still advanced.
    WriteFailed(DutyCycle),
}

pub struct ControlLoop<S, A> {
    controller: FanController,
    source: S,
    actuator: A,
    options: LoopOptions,
    watchdog: SensorWatchdog,
    status_tx: watch::Sender<FanStatus>,
}

impl<S, A> ControlLoop<S, A>
where
    S: TemperatureSource,
    A: Actuator,
{
    pub fn new(controller: FanController, source: S, actuator: A, options: LoopOptions) -> Self {
        let (status_tx, _) = watch::channel(FanStatus::default());

        Self {
            controller,
            source,
            actuator,
            watchdog: SensorWatchdog::new(options.alarm_after),
            options,
            status_tx,
        }
    }

    /// Observe the status published after each iteration.
    pub fn subscribe(&self) -> watch::Receiver<FanStatus> {
        self.status_tx.subscribe()
    }

    pub fn controller(&self) -> &FanController {
        &self.controller
    }

    /// Run until `cancellation` fires or the sensor is declared unavailable.
    ///
    /// The first iteration runs immediately. On cancellation the fan is
    /// stopped and its output released if `stop_on_exit` is set. When the
    /// sensor is given up on, the temperature is unknown, so the fan is left
    /// at full speed instead.
    pub async fn run(mut self, cancellation: CancellationToken) -> Result<()> {
        let mut interval = tokio::time::interval(self.options.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            channel = self.options.channel,
            interval_s = self.options.interval.as_secs_f64(),
            "Fan control loop started"
        );

        let result = loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!("Fan control loop shutdown requested");
                    break Ok(());
                }
                _ = interval.tick() => {
                    if let Err(e) = self.step().await {
                        break Err(e);
                    }
                }
            }
        };

        match &result {
            Ok(()) if self.options.stop_on_exit => self.stop().await,
            Ok(()) => {}
            Err(_) => self.fail_safe().await,
        }

        trace!("Fan control loop stopped");
        result
    }

    /// One iteration: read, evaluate, and write if the controller asks for it.
    ///
    /// Only a sensor outage exceeding `max_read_failures` is an error; every
    /// other fault is logged and reported through the outcome.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let temperature = match self.source.read_temperature().await {
            Ok(temperature) => temperature,
            Err(e) => return self.handle_read_failure(e),
        };

        if self.watchdog.record_success() == WatchdogStatus::Recovered {
            info!(temp_c = %temperature, "Temperature readings recovered");
        }

        let previous_state = self.controller.state();
        let duty = self.controller.evaluate(temperature);
        let state = self.controller.state();

        if state != previous_state {
            info!(
                previous_state = %previous_state,
                new_state = %state,
                temp_c = %temperature,
                duty = duty.raw(),
                "Fan state changed"
            );
        }

        debug!(
            temp_c = %temperature,
            band = %self.controller.band(),
            state = %state,
            duty = duty.raw(),
            running = self.controller.running(),
            "Fan control tick"
        );

        let outcome = if self.controller.should_apply() {
            match self.actuator.set_duty(self.options.channel, duty).await {
                Ok(()) => StepOutcome::Applied(duty),
                Err(e) => {
                    warn!(
                        channel = self.options.channel,
                        duty = duty.raw(),
                        error = %e,
                        "Failed to set fan duty"
                    );
                    StepOutcome::WriteFailed(duty)
                }
            }
        } else {
            StepOutcome::Held(duty)
        };

        self.publish(Some(temperature));
        Ok(outcome)
    }

    fn handle_read_failure(&mut self, error: SensorError) -> Result<StepOutcome> {
        let status = self.watchdog.record_failure();
        let failures = self.watchdog.consecutive_failures();

        match status {
            WatchdogStatus::Tripped => error!(
                failures,
                duty = self.controller.duty().raw(),
                error = %error,
                "Temperature readings keep failing; holding last duty"
            ),
            _ => warn!(failures, error = %error, "Temperature read failed; skipping cycle"),
        }

        let previous = self.status_tx.borrow().temperature_c;
        self.publish(previous);

        match self.options.max_read_failures {
            Some(max) if failures >= max => Err(Error::SensorUnavailable {
                failures,
                last: error,
            }),
            _ => Ok(StepOutcome::ReadFailed),
        }
    }

    fn publish(&self, temperature_c: Option<f64>) {
        self.status_tx.send_replace(FanStatus {
            temperature_c,
            duty: self.controller.duty(),
            state: self.controller.state(),
            consecutive_read_failures: self.watchdog.consecutive_failures(),
        });
    }

    async fn stop(&mut self) {
        match self
            .actuator
            .set_duty(self.options.channel, DutyCycle::OFF)
            .await
        {
            Ok(()) => info!(channel = self.options.channel, "Fan stopped"),
            Err(e) => error!(channel = self.options.channel, error = %e, "Failed to stop fan"),
        }

        if let Err(e) = self.actuator.release(self.options.channel).await {
            error!(channel = self.options.channel, error = %e, "Failed to release fan output");
        }
    }

    async fn fail_safe(&mut self) {
        match self
            .actuator
            .set_duty(self.options.channel, DutyCycle::MAX)
            .await
        {
            Ok(()) => warn!(
                channel = self.options.channel,
                "Temperature unknown; leaving fan at full speed"
            ),
            Err(e) => error!(
                channel = self.options.channel,
                error = %e,
                "Failed to set fan to full speed"
            ),
        }
    }
}
