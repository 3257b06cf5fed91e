//! Hysteresis fan control for Linux thermal zones.
//!
//! [`thermal::FanController`] is the I/O-free policy. [`control::ControlLoop`]
//! ties it to a [`sensor::TemperatureSource`] and an [`actuator::Actuator`]
//! and runs it on a fixed interval until cancelled.

pub mod actuator;
pub mod config;
pub mod control;
pub mod error;
pub mod sensor;
pub mod thermal;
pub mod tracing;
