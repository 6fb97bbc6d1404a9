//! Hardware setup for the thermo-rs station
//!
//! Builds the shared I2C bus and the two devices hanging off it: the SSD1306
//! OLED and the AHT20 sensor.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use esp_hal::Async;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{GPIO17, GPIO18, I2C0};
use esp_hal::time::Rate;
use log::{debug, info};
use ssd1306::mode::{BufferedGraphicsModeAsync, DisplayConfigAsync};
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306Async};
use static_cell::StaticCell;
use thermo_core::async_i2c_bus::AsyncI2cDevice;
use thermo_core::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, Screen};
use thermo_core::sensors::Aht20Sensor;

pub type I2cBus = I2c<'static, Async>;

/// One device's handle on the shared bus.
pub type SharedI2c = AsyncI2cDevice<'static, CriticalSectionRawMutex, I2cBus>;

pub type TemperatureSensor = Aht20Sensor<SharedI2c, embassy_time::Delay>;

type Oled = Ssd1306Async<
    I2CInterface<SharedI2c>,
    DisplaySize128x64,
    BufferedGraphicsModeAsync<DisplaySize128x64>,
>;

const I2C_FREQUENCY_KHZ: u32 = 400;

/// Configure I2C0 on SDA=GPIO18, SCL=GPIO17 at 400 kHz.
pub fn create_i2c_bus(i2c0: I2C0<'static>, sda: GPIO18<'static>, scl: GPIO17<'static>) -> I2cBus {
    I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("I2C0 rejects the bus configuration")
    .with_sda(sda)
    .with_scl(scl)
    .into_async()
}

/// Moves the bus into static storage and hands out one device per peripheral.
///
/// # Returns
/// A tuple of (display handle, sensor handle)
pub fn share_i2c_bus(bus: I2cBus) -> (SharedI2c, SharedI2c) {
    static I2C0_BUS: StaticCell<AsyncMutex<CriticalSectionRawMutex, I2cBus>> = StaticCell::new();
    let bus = I2C0_BUS.init(AsyncMutex::new(bus));

    info!("I2C bus ready at {} kHz", I2C_FREQUENCY_KHZ);
    (AsyncI2cDevice::new(bus), AsyncI2cDevice::new(bus))
}

pub fn create_sensor(i2c: SharedI2c) -> TemperatureSensor {
    Aht20Sensor::new(i2c, embassy_time::Delay)
}

/// 128x64 SSD1306 OLED at 0x3C in buffered mode.
///
/// Drawing only touches the driver's RAM buffer; [`Screen::flush`] pushes it
/// to the panel.
pub struct OledScreen {
    oled: Oled,
}

impl OledScreen {
    pub fn new(i2c: SharedI2c) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let oled = Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { oled }
    }
}

impl OriginDimensions for OledScreen {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for OledScreen {
    type Color = BinaryColor;
    type Error = <Oled as DrawTarget>::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        DrawTarget::draw_iter(&mut self.oled, pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        DrawTarget::clear(&mut self.oled, color)
    }
}

impl Screen for OledScreen {
    async fn init(&mut self) -> Result<(), DisplayError> {
        self.oled.init().await.map_err(|e| {
            debug!("SSD1306 init failed: {:?}", e);
            DisplayError::InitFailed
        })
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        self.oled.flush().await.map_err(|e| {
            debug!("SSD1306 flush failed: {:?}", e);
            DisplayError::TransferFailed
        })
    }
}
