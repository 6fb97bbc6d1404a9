//! Sensor trait and drivers

mod aht20;

pub use aht20::{AHT20_ADDRESS, Aht20Sensor};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} failed to {operation}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor} timed out waiting to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// One combined temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl Reading {
    pub const fn new(temperature_celsius: f32, humidity_percent: f32) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
        }
    }
}

/// A temperature/humidity peripheral.
pub trait Sensor {
    /// Bring the peripheral up. Called once, before the first [`Sensor::read`].
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Take one sample.
    fn read(&mut self) -> impl Future<Output = Result<Reading, SensorError>>;
}
