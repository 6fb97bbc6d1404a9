//! Hardware-independent core library for thermo-rs
//!
//! This crate contains the platform-agnostic half of the temperature station:
//! the shared temperature state, the sensor trait and AHTx0 driver, the OLED
//! layout, the HTTP status endpoint, the WiFi join loop, the startup sequence
//! and the sense-display-serve cycle that ties them together.
//!
//! It is `#![no_std]` and allocation-free so it compiles on the ESP32-S3
//! target as well as on desktop hosts (for the simulator and tests).

#![no_std]

pub mod app_state;
pub mod async_i2c_bus;
pub mod config;
pub mod device;
pub mod display;
pub mod framebuffer;
pub mod http;
pub mod network;
pub mod sensors;
pub mod server;
pub mod startup;

#[cfg(test)]
mod test_support;
