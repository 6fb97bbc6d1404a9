//! Application-wide state and error types for thermo-rs

use core::fmt;

use thiserror_no_std::Error;

use crate::sensors::{Reading, SensorError};

/// A temperature in degrees Celsius.
///
/// Formats with the default `f32` formatting, so `23.5` renders as `23.5`
/// and the start-up sentinel renders as `0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Temperature(f32);

impl Temperature {
    /// Value held before the first reading completes.
    pub const SENTINEL: Self = Self(0.0);

    /// Value recorded when a steady-state read fails.
    pub const UNREAD: Self = Self(f32::NAN);

    pub const fn from_celsius(celsius: f32) -> Self {
        Self(celsius)
    }

    pub const fn celsius(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// State owned by the main cycle and lent to the render and serve steps.
///
/// There is exactly one writer, [`AppState::record`], called once per cycle.
#[derive(Debug, Clone, Copy)]
pub struct AppState {
    temperature: Temperature,
    cycles: u32,
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            temperature: Temperature::SENTINEL,
            cycles: 0,
        }
    }

    /// Store the outcome of this cycle's sensor read.
    ///
    /// A failed read is not retried and does not keep the previous value: it
    /// is recorded as [`Temperature::UNREAD`].
    pub fn record(&mut self, reading: Result<Reading, SensorError>) {
        self.temperature = match reading {
            Ok(reading) => Temperature::from_celsius(reading.temperature_celsius),
            Err(_) => Temperature::UNREAD,
        };
        self.cycles = self.cycles.wrapping_add(1);
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Number of completed sense steps.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fatal start-up failures. Either one stops the device for good.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    #[error("display not found")]
    DisplayNotFound,
    #[error("temperature sensor not found")]
    SensorNotFound,
}
