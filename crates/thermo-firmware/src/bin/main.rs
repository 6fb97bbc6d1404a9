#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::Cell;

use embassy_executor::Spawner;
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;
use thermo_core::config::HTTP_PORT;
use thermo_core::startup::{Parts, bring_up_or_report};
use thermo_firmware::halt;
use thermo_firmware::hardware::{OledScreen, create_i2c_bus, create_sensor, share_i2c_bus};
use thermo_firmware::socket::SocketTransport;
use thermo_firmware::wifi::{StackSlot, WifiLink};
use thermo_firmware::wifi_secrets::CREDENTIALS;

/// Room for one request head or one status page response.
const TCP_BUFFER_LEN: usize = 1536;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let bus = create_i2c_bus(peripherals.I2C0, peripherals.GPIO18, peripherals.GPIO17);
    let (display_i2c, sensor_i2c) = share_i2c_bus(bus);

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    // The radio stays off until the start-up sequence reaches the network.
    let stack: StackSlot = Cell::new(None);
    let network = WifiLink::new(spawner, peripherals.WIFI, seed, &stack);

    static RX_BUFFER: StaticCell<[u8; TCP_BUFFER_LEN]> = StaticCell::new();
    static TX_BUFFER: StaticCell<[u8; TCP_BUFFER_LEN]> = StaticCell::new();
    let transport = SocketTransport::new(
        &stack,
        RX_BUFFER.init([0; TCP_BUFFER_LEN]),
        TX_BUFFER.init([0; TCP_BUFFER_LEN]),
        HTTP_PORT,
    );

    let parts = Parts {
        screen: OledScreen::new(display_i2c),
        sensor: create_sensor(sensor_i2c),
        network,
        transport,
        delay: embassy_time::Delay,
        credentials: CREDENTIALS,
    };

    match bring_up_or_report(parts).await {
        Ok(device) => device.run().await,
        Err(_) => halt().await,
    }
}
