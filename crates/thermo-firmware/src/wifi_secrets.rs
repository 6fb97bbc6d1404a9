//! WiFi credentials baked in at build time.
//!
//! `build.rs` reads `WIFI_SSID` and `WIFI_PASSWORD` from `.env` (see
//! `.env.example`) or the build environment.

use thermo_core::config::Credentials;

pub const CREDENTIALS: Credentials =
    Credentials::new(env!("WIFI_SSID"), env!("WIFI_PASSWORD"));
