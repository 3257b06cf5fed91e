//! Replays a recorded temperature trace through the fan controller and
//! prints the duty the daemon would have commanded at every sample.
//!
//! Useful for picking thresholds before touching hardware.

mod replay;
mod trace;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use fanctl::thermal::{ControllerConfig, FanController, FanState};
use tracing_subscriber::EnvFilter;

use crate::replay::{ReplayStep, Summary};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV trace with `elapsed_s,temperature_c` columns
    trace: PathBuf,

    /// Start cooling at or above this temperature (°C)
    #[arg(long, default_value_t = 55.0, allow_negative_numbers = true)]
    temp_on: f64,

    /// Stop cooling at or below this temperature (°C)
    #[arg(long, default_value_t = 50.0, allow_negative_numbers = true)]
    temp_off: f64,

    /// Full speed at or above this temperature (°C)
    #[arg(long = "full-speed", default_value_t = 70.0, allow_negative_numbers = true)]
    full_speed_temp: f64,

    /// Only print samples where the fan state changed
    #[arg(long)]
    changes_only: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = ControllerConfig {
        temp_on: args.temp_on,
        temp_off: args.temp_off,
        full_speed_temp: args.full_speed_temp,
    };
    let mut controller = FanController::new(config).context("invalid thresholds")?;

    let samples = trace::load(&args.trace)?;
    tracing::debug!(samples = samples.len(), "Loaded trace");

    let steps = replay::replay(&mut controller, &samples);

    println!(
        "{:>10}  {:>8}  {:<9}  {:<10}  {:>5}  {:>6}  {}",
        "elapsed_s", "temp_c", "band", "state", "duty", "pct", "write"
    );
    for step in steps.iter().filter(|step| !args.changes_only || step.state_changed) {
        print_step(step);
    }

    print_summary(&replay::summarize(&steps));
    Ok(())
}

fn print_step(step: &ReplayStep) {
    let state = format!("{:<10}", step.state.to_string());
    println!(
        "{:>10.1}  {:>8.2}  {:<9}  {}  {:>5}  {:>5.1}%  {}",
        step.sample.elapsed_s,
        step.sample.temperature_c,
        step.band.to_string(),
        paint(step.state, state),
        step.duty.raw(),
        step.duty.percent(),
        if step.write { "yes" } else { "-" }
    );
}

fn paint(state: FanState, text: String) -> ColoredString {
    match state {
        FanState::Idle => text.green(),
        FanState::Ramping => text.yellow(),
        FanState::FullSpeed => text.red().bold(),
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Samples:     {}", summary.samples);
    println!("PWM writes:  {}", summary.writes);
    println!("Transitions: {}", summary.transitions);
    println!("Full speed:  {:.1} s", summary.full_speed_s);
    if let Some(max) = summary.max_temperature_c {
        println!("Peak:        {max:.2} °C");
    }
}
