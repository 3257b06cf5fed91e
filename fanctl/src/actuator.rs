//! PWM outputs that accept a fan duty cycle.

use std::collections::HashSet;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::thermal::DutyCycle;
use crate::tracing::prelude::*;

/// First PWM controller; channel 0 is routed to GPIO18 on a Raspberry Pi
/// with the `pwm` overlay.
pub const DEFAULT_PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

/// 4-pin PC fans expect a 25 kHz control signal.
pub const DEFAULT_PWM_FREQUENCY_HZ: u32 = 25_000;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("PWM frequency must be between 1 Hz and 1 GHz, got {0} Hz")]
    InvalidFrequency(u32),
}

/// A PWM sink driving one or more fan channels.
#[async_trait]
pub trait Actuator: Send {
    async fn set_duty(&mut self, channel: u8, duty: DutyCycle) -> Result<(), ActuatorError>;

    /// Disable the output of `channel`. Called once on clean shutdown, after
    /// the duty has been driven to 0.
    async fn release(&mut self, _channel: u8) -> Result<(), ActuatorError> {
        Ok(())
    }
}

/// Linux PWM class device (`/sys/class/pwm/pwmchipN`).
///
/// Channels are exported, given their period and enabled by
/// [`init`](Self::init), which the first duty write does implicitly.
/// [`release`](Actuator::release) disables them again.
#[derive(Debug)]
pub struct SysfsPwm {
    chip: PathBuf,
    period_ns: u64,
    prepared: HashSet<u8>,
}

impl SysfsPwm {
    pub fn new(chip: impl Into<PathBuf>, frequency_hz: u32) -> Result<Self, ActuatorError> {
        if frequency_hz == 0 || u64::from(frequency_hz) > NANOS_PER_SECOND {
            return Err(ActuatorError::InvalidFrequency(frequency_hz));
        }

        Ok(Self {
            chip: chip.into(),
            period_ns: NANOS_PER_SECOND / u64::from(frequency_hz),
            prepared: HashSet::new(),
        })
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    fn channel_dir(&self, channel: u8) -> PathBuf {
        self.chip.join(format!("pwm{channel}"))
    }

    /// Export `channel` if needed, program the period and enable the output.
    /// A no-op for channels already initialised.
    pub async fn init(&mut self, channel: u8) -> Result<(), ActuatorError> {
        if self.prepared.contains(&channel) {
            return Ok(());
        }

        let dir = self.channel_dir(channel);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            debug!(chip = %self.chip.display(), channel, "Exporting PWM channel");
            write_attr(&self.chip.join("export"), channel).await?;
        }

        // The kernel rejects a period shorter than the current duty cycle.
        write_attr(&dir.join("duty_cycle"), 0).await?;
        write_attr(&dir.join("period"), self.period_ns).await?;
        write_attr(&dir.join("enable"), 1).await?;

        info!(
            chip = %self.chip.display(),
            channel,
            period_ns = self.period_ns,
            "PWM channel enabled"
        );
        self.prepared.insert(channel);
        Ok(())
    }
}

#[async_trait]
impl Actuator for SysfsPwm {
    async fn set_duty(&mut self, channel: u8, duty: DutyCycle) -> Result<(), ActuatorError> {
        self.init(channel).await?;

        let pulse_ns = duty.pulse_width_ns(self.period_ns);
        write_attr(&self.channel_dir(channel).join("duty_cycle"), pulse_ns).await
    }

    async fn release(&mut self, channel: u8) -> Result<(), ActuatorError> {
        if !self.prepared.remove(&channel) {
            return Ok(());
        }

        write_attr(&self.channel_dir(channel).join("enable"), 0).await?;
        info!(chip = %self.chip.display(), channel, "PWM channel disabled");
        Ok(())
    }
}

async fn write_attr(path: &Path, value: impl Display) -> Result<(), ActuatorError> {
    tokio::fs::write(path, value.to_string())
        .await
        .map_err(|source| ActuatorError::Write {
            path: path.to_owned(),
            source,
        })
}

/// Logs duties instead of touching hardware.
#[derive(Debug, Default)]
pub struct DryRunActuator;

impl DryRunActuator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Actuator for DryRunActuator {
    async fn set_duty(&mut self, channel: u8, duty: DutyCycle) -> Result<(), ActuatorError> {
        info!(
            channel,
            duty = duty.raw(),
            percent = duty.percent(),
            "Dry run: would set duty"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn chip_with_channel(channel: u8) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(format!("pwm{channel}"))).unwrap();
        fs::write(dir.path().join("export"), "").unwrap();
        dir
    }

    fn read(dir: &tempfile::TempDir, attr: &str) -> String {
        fs::read_to_string(dir.path().join(attr)).unwrap()
    }

    #[test]
    fn should_derive_period_from_frequency() {
        let pwm = SysfsPwm::new("/nonexistent", DEFAULT_PWM_FREQUENCY_HZ).unwrap();
        assert_eq!(pwm.period_ns(), 40_000);
    }

    #[test]
    fn should_reject_zero_frequency() {
        let err = SysfsPwm::new("/nonexistent", 0).unwrap_err();
        assert!(matches!(err, ActuatorError::InvalidFrequency(0)));
    }

    #[tokio::test]
    async fn should_configure_channel_on_first_write() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();

        pwm.set_duty(0, DutyCycle::MAX).await.unwrap();

        assert_eq!(read(&chip, "pwm0/period"), "40000");
        assert_eq!(read(&chip, "pwm0/enable"), "1");
        assert_eq!(read(&chip, "pwm0/duty_cycle"), "40000");
        assert_eq!(read(&chip, "export"), "");
    }

    #[tokio::test]
    async fn should_scale_duty_to_pulse_width() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();

        pwm.set_duty(0, DutyCycle::new(51)).await.unwrap();
        assert_eq!(read(&chip, "pwm0/duty_cycle"), "8000");

        pwm.set_duty(0, DutyCycle::OFF).await.unwrap();
        assert_eq!(read(&chip, "pwm0/duty_cycle"), "0");
    }

    #[tokio::test]
    async fn should_not_reconfigure_prepared_channel() {
        let chip = chip_with_channel(1);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();
        pwm.set_duty(1, DutyCycle::new(10)).await.unwrap();

        fs::write(chip.path().join("pwm1/enable"), "0").unwrap();
        pwm.set_duty(1, DutyCycle::new(20)).await.unwrap();

        assert_eq!(read(&chip, "pwm1/enable"), "0");
    }

    #[tokio::test]
    async fn should_export_missing_channel() {
        let chip = tempfile::tempdir().unwrap();
        fs::write(chip.path().join("export"), "").unwrap();
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();

        // A plain directory does not create pwm2/ on export, so the
        // follow-up attribute write fails.
        let err = pwm.set_duty(2, DutyCycle::MAX).await.unwrap_err();

        assert_eq!(read(&chip, "export"), "2");
        assert!(matches!(err, ActuatorError::Write { .. }));
    }

    #[tokio::test]
    async fn should_init_channel_without_duty_write() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();

        pwm.init(0).await.unwrap();

        assert_eq!(read(&chip, "pwm0/enable"), "1");
        assert_eq!(read(&chip, "pwm0/period"), "40000");
        assert_eq!(read(&chip, "pwm0/duty_cycle"), "0");
    }

    #[tokio::test]
    async fn should_disable_channel_on_release() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();
        pwm.set_duty(0, DutyCycle::new(100)).await.unwrap();

        pwm.release(0).await.unwrap();

        assert_eq!(read(&chip, "pwm0/enable"), "0");
    }

    #[tokio::test]
    async fn should_ignore_release_of_unused_channel() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();

        pwm.release(0).await.unwrap();

        assert!(!chip.path().join("pwm0/enable").exists());
    }

    #[tokio::test]
    async fn should_reinit_channel_after_release() {
        let chip = chip_with_channel(0);
        let mut pwm = SysfsPwm::new(chip.path(), DEFAULT_PWM_FREQUENCY_HZ).unwrap();
        pwm.set_duty(0, DutyCycle::MAX).await.unwrap();
        pwm.release(0).await.unwrap();

        pwm.set_duty(0, DutyCycle::MAX).await.unwrap();

        assert_eq!(read(&chip, "pwm0/enable"), "1");
    }

    #[tokio::test]
    async fn dry_run_should_accept_any_duty() {
        let mut actuator = DryRunActuator::new();
        actuator.set_duty(0, DutyCycle::MAX).await.unwrap();
    }
}
