use thiserror::Error;

use crate::sensor::SensorError;
use crate::thermal::InvalidConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidConfig(#[from] InvalidConfig),

    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("temperature sensor unavailable after {failures} consecutive failed reads")]
    SensorUnavailable {
        failures: u32,
        #[source]
        last: SensorError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
