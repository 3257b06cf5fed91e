//! Fan control daemon.
//!
//! Samples a thermal zone on a fixed interval and drives a PWM fan through
//! the hysteresis controller until SIGINT or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use fanctl::actuator::{Actuator, DryRunActuator, SysfsPwm};
use fanctl::config::{Args, DaemonConfig};
use fanctl::control::{ControlLoop, LoopOptions};
use fanctl::sensor::SysfsThermalZone;
use fanctl::thermal::FanController;
use fanctl::tracing::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    fanctl::tracing::init_journald_or_stdout();

    let config = DaemonConfig::try_from(args).context("refusing to start")?;
    let controller = FanController::new(config.controller).context("refusing to start")?;

    info!(
        temp_on_c = %config.controller.temp_on,
        temp_off_c = %config.controller.temp_off,
        full_speed_c = %config.controller.full_speed_temp,
        sensor = %config.sensor.display(),
        dry_run = config.dry_run,
        "Starting fan control"
    );

    let running = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(running.clone()));

    let source = SysfsThermalZone::new(&config.sensor);

    if config.dry_run {
        run(controller, source, DryRunActuator::new(), config.loop_options, running).await
    } else {
        let pwm = SysfsPwm::new(&config.pwm.chip, config.pwm.frequency_hz)
            .context("invalid PWM settings")?;
        run(controller, source, pwm, config.loop_options, running).await
    }
}

async fn run<A: Actuator>(
    controller: FanController,
    source: SysfsThermalZone,
    actuator: A,
    options: LoopOptions,
    running: CancellationToken,
) -> Result<()> {
    ControlLoop::new(controller, source, actuator, options)
        .run(running)
        .await
        .context("fan control loop failed")?;

    info!("Exiting.");
    Ok(())
}

async fn shutdown_on_signal(running: CancellationToken) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM; only Ctrl-C will stop the daemon");
            if tokio::signal::ctrl_c().await.is_ok() {
                running.cancel();
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
    }

    running.cancel();
}
