//! Temperature sources.
//!
//! The control loop only needs [`TemperatureSource`]. On Linux the usual
//! source is a thermal zone exported through sysfs, which reports an integer
//! in millidegrees Celsius.

use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Thermal zone of the SoC on most single-board computers.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Readings outside this range come from a broken or disconnected sensor.
const PLAUSIBLE_RANGE_C: RangeInclusive<f64> = -50.0..=150.0;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed reading {raw:?} from {}", path.display())]
    Malformed { path: PathBuf, raw: String },

    #[error("implausible temperature {celsius} °C from {}", path.display())]
    Implausible { path: PathBuf, celsius: f64 },
}

/// A device that reports a temperature in °C.
#[async_trait]
pub trait TemperatureSource: Send {
    async fn read_temperature(&mut self) -> Result<f64, SensorError>;
}

/// Linux thermal zone (`/sys/class/thermal/thermal_zoneN/temp`).
#[derive(Debug, Clone)]
pub struct SysfsThermalZone {
    path: PathBuf,
}

impl SysfsThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, raw: &str) -> Result<f64, SensorError> {
        let millidegrees: f64 = raw.trim().parse().map_err(|_| SensorError::Malformed {
            path: self.path.clone(),
            raw: raw.trim().to_owned(),
        })?;

        let celsius = millidegrees / 1000.0;
        if !celsius.is_finite() || !PLAUSIBLE_RANGE_C.contains(&celsius) {
            return Err(SensorError::Implausible {
                path: self.path.clone(),
                celsius,
            });
        }

        Ok(celsius)
    }
}

impl Default for SysfsThermalZone {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_ZONE)
    }
}

#[async_trait]
impl TemperatureSource for SysfsThermalZone {
    async fn read_temperature(&mut self) -> Result<f64, SensorError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SensorError::Io {
                path: self.path.clone(),
                source,
            })?;

        self.decode(&raw)
    }
}
