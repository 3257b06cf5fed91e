mod config;
mod controller;
mod duty;
mod state;

pub use config::{ControllerConfig, InvalidConfig};
pub use controller::{Band, FanController};
pub use duty::DutyCycle;
pub use state::FanState;
