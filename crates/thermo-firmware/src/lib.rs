//! ESP32-S3 firmware-specific modules for thermo-rs
//!
//! Everything here touches esp-hal peripherals, the radio or the embassy-net
//! stack and cannot compile on desktop targets. The device logic itself lives
//! in `thermo-core`; this crate only supplies the concrete screen, bus, link
//! and socket behind its traits.

#![no_std]

extern crate alloc;

pub mod hardware;
pub mod socket;
pub mod wifi;
pub mod wifi_secrets;

/// Parks the calling task forever without spinning.
pub async fn halt() -> ! {
    loop {
        core::future::pending::<()>().await;
    }
}
