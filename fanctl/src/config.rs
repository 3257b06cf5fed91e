//! Daemon configuration from command-line flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::actuator::{DEFAULT_PWM_CHIP, DEFAULT_PWM_FREQUENCY_HZ};
use crate::control::LoopOptions;
use crate::error::{Error, Result};
use crate::sensor::DEFAULT_THERMAL_ZONE;
use crate::thermal::ControllerConfig;

/// Keep a thermal zone inside its band by driving a PWM fan.
#[derive(Debug, Clone, Parser)]
#[command(name = "fanctld", version, about)]
pub struct Args {
    /// Start cooling at or above this temperature (°C)
    #[arg(
        long,
        env = "FANCTL_TEMP_ON",
        default_value_t = 55.0,
        allow_negative_numbers = true,
        value_name = "CELSIUS",
    )]
    pub temp_on: f64,

    /// Stop cooling at or below this temperature (°C)
    #[arg(
        long,
        env = "FANCTL_TEMP_OFF",
        default_value_t = 50.0,
        allow_negative_numbers = true,
        value_name = "CELSIUS",
    )]
    pub temp_off: f64,

    /// Run the fan at full speed at or above this temperature (°C)
    #[arg(
        long = "full-speed",
        env = "FANCTL_FULL_SPEED",
        default_value_t = 70.0,
        allow_negative_numbers = true,
        value_name = "CELSIUS",
    )]
    pub full_speed_temp: f64,

    /// Seconds between temperature samples
    #[arg(long, env = "FANCTL_INTERVAL", default_value_t = 10, value_name = "SECONDS")]
    pub interval: u64,

    /// Thermal zone file reporting millidegrees Celsius
    #[arg(long, env = "FANCTL_SENSOR", default_value = DEFAULT_THERMAL_ZONE)]
    pub sensor: PathBuf,

    /// PWM chip directory in sysfs
    #[arg(long, env = "FANCTL_PWM_CHIP", default_value = DEFAULT_PWM_CHIP)]
    pub pwm_chip: PathBuf,

    /// PWM channel the fan is wired to
    #[arg(long, env = "FANCTL_PWM_CHANNEL", default_value_t = 0)]
    pub pwm_channel: u8,

    /// PWM frequency in Hz
    #[arg(
        long,
        env = "FANCTL_PWM_FREQUENCY",
        default_value_t = DEFAULT_PWM_FREQUENCY_HZ,
        value_name = "HZ",
    )]
    pub pwm_frequency: u32,

    /// Log duty changes instead of writing to the PWM device
    #[arg(long, env = "FANCTL_DRY_RUN")]
    pub dry_run: bool,

    /// Leave the fan at its last duty on shutdown instead of stopping it
    #[arg(long, env = "FANCTL_KEEP_DUTY_ON_EXIT")]
    pub keep_duty_on_exit: bool,

    /// Exit after this many consecutive failed reads (0 retries forever)
    #[arg(long, env = "FANCTL_MAX_READ_FAILURES", default_value_t = 0)]
    pub max_read_failures: u32,

    /// Log an error once reads have been failing this many seconds
    #[arg(long, env = "FANCTL_ALARM_AFTER", default_value_t = 60, value_name = "SECONDS")]
    pub alarm_after: u64,
}

#[derive(Debug, Clone)]
pub struct PwmSettings {
    pub chip: PathBuf,
    pub frequency_hz: u32,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub controller: ControllerConfig,
    pub sensor: PathBuf,
    pub pwm: PwmSettings,
    pub dry_run: bool,
    pub loop_options: LoopOptions,
}

impl TryFrom<Args> for DaemonConfig {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        let controller = ControllerConfig {
            temp_on: args.temp_on,
            temp_off: args.temp_off,
            full_speed_temp: args.full_speed_temp,
        };
        controller.validate()?;

        if args.interval == 0 {
            return Err(Error::ZeroInterval);
        }

        Ok(Self {
            controller,
            sensor: args.sensor,
            pwm: PwmSettings {
                chip: args.pwm_chip,
                frequency_hz: args.pwm_frequency,
            },
            dry_run: args.dry_run,
            loop_options: LoopOptions {
                channel: args.pwm_channel,
                interval: Duration::from_secs(args.interval),
                stop_on_exit: !args.keep_duty_on_exit,
                max_read_failures: (args.max_read_failures > 0).then_some(args.max_read_failures),
                alarm_after: Duration::from_secs(args.alarm_after),
            },
        })
    }
}
