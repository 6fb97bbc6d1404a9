//! Station-mode WiFi link on the ESP32-S3 radio.
//!
//! [`WifiLink`] holds the WiFi peripheral untouched until `begin`, which is
//! where the radio is powered, the embassy-net DHCP stack is built and two
//! background tasks are spawned: one keeps the station associated, the other
//! drives the IP stack. The stack is published through a [`StackSlot`] for
//! the HTTP socket, and reachability is read back from its DHCP lease.

use core::cell::Cell;
use core::net::Ipv4Addr;

use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::Timer;
use esp_hal::peripherals::WIFI;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{debug, error, info};
use static_cell::StaticCell;
use thermo_core::config::{Credentials, JOIN_RETRY_INTERVAL};
use thermo_core::network::NetworkLink;

/// Sockets the stack can hold at once. Only the HTTP listener is used.
const SOCKET_COUNT: usize = 3;

/// Where the network stack appears once the radio is up.
pub type StackSlot = Cell<Option<Stack<'static>>>;

pub struct WifiLink<'a> {
    spawner: Spawner,
    wifi: Option<WIFI<'static>>,
    seed: u64,
    stack: &'a StackSlot,
}

impl<'a> WifiLink<'a> {
    /// Nothing is powered or transmitted until [`NetworkLink::begin`].
    pub fn new(spawner: Spawner, wifi: WIFI<'static>, seed: u64, stack: &'a StackSlot) -> Self {
        Self {
            spawner,
            wifi: Some(wifi),
            seed,
            stack,
        }
    }
}

impl NetworkLink for WifiLink<'_> {
    async fn begin(&mut self, credentials: &Credentials) {
        let Some(wifi) = self.wifi.take() else {
            debug!("WiFi already started");
            return;
        };

        static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
        let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

        let (controller, interfaces) = esp_radio::wifi::new(&*radio, wifi, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

        static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();
        let (stack, runner) = embassy_net::new(
            interfaces.sta,
            embassy_net::Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            self.seed,
        );
        self.stack.set(Some(stack));

        match connection(controller, *credentials) {
            Ok(token) => self.spawner.spawn(token),
            Err(e) => error!("Failed to spawn WiFi connection task: {:?}", e),
        }
        match net_task(runner) {
            Ok(token) => self.spawner.spawn(token),
            Err(e) => error!("Failed to spawn network task: {:?}", e),
        }
    }

    fn current_address(&self) -> Option<Ipv4Addr> {
        let config = self.stack.get()?.config_v4()?;
        Some(config.address.address())
    }
}

/// Keeps the station associated, retrying every [`JOIN_RETRY_INTERVAL`].
#[embassy_executor::task]
async fn connection(mut controller: WifiController<'static>, credentials: Credentials) {
    loop {
        if matches!(controller.is_connected(), Ok(true)) {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            info!("WiFi connection lost");
            Timer::after(JOIN_RETRY_INTERVAL).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(credentials.ssid.into())
                    .with_password(credentials.password.into()),
            );
            if let Err(e) = controller.set_config(&config) {
                debug!("WiFi configuration rejected: {:?}", e);
                Timer::after(JOIN_RETRY_INTERVAL).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                debug!("WiFi start failed: {:?}", e);
                Timer::after(JOIN_RETRY_INTERVAL).await;
                continue;
            }
            debug!("WiFi started");
        }

        match controller.connect_async().await {
            Ok(()) => debug!("Associated with {}", credentials.ssid),
            Err(e) => {
                debug!("Association failed: {:?}", e);
                Timer::after(JOIN_RETRY_INTERVAL).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
