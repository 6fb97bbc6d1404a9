//! Compile-time configuration
//!
//! There is no runtime configuration surface. Timing and port constants live
//! here; WiFi credentials are baked into the firmware image by its build script.

use embassy_time::Duration;

/// TCP port the status endpoint listens on.
pub const HTTP_PORT: u16 = 80;

/// Pause at the end of every sense-display-serve cycle.
pub const CYCLE_PERIOD: Duration = Duration::from_secs(2);

/// Interval between checks while waiting for the WiFi association.
pub const JOIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Credentials of the single network the device joins.
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl Credentials {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}
