//! Desktop simulator for the thermo-rs temperature station.
//!
//! Runs the same start-up sequence and device cycle as the firmware, with the
//! OLED shown in an SDL2 window via `embedded-graphics-simulator`, a synthetic
//! sensor, a loopback "network" and the status page served from a plain
//! `std` TCP listener.
//!
//! Browse to <http://127.0.0.1:8080/> while it runs. Close the window or press
//! Q to quit; the window only reacts once per cycle, when the screen is
//! flushed.

use std::cell::Cell;
use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Shutdown, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use embedded_hal_async::delay::DelayNs;
use log::{error, info};

use thermo_core::config::Credentials;
use thermo_core::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, DisplayError, Screen};
use thermo_core::framebuffer::FrameBuffer;
use thermo_core::network::NetworkLink;
use thermo_core::sensors::{Reading, Sensor, SensorError};
use thermo_core::server::HttpTransport;
use thermo_core::startup::{Parts, bring_up_or_report};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 4;

/// The firmware listens on 80; an unprivileged port is friendlier on a desktop.
const SIMULATOR_HTTP_PORT: u16 = 8080;

/// Failed association checks before the loopback link reports an address.
const JOIN_DELAY_CHECKS: u32 = 2;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// The OLED, drawn into a [`FrameBuffer`] and pushed to an SDL2 window.
struct SimulatorScreen {
    frame: FrameBuffer,
    display: SimulatorDisplay<BinaryColor>,
    window: Window,
}

impl SimulatorScreen {
    fn new() -> Self {
        let output_settings = OutputSettingsBuilder::new()
            .scale(WINDOW_SCALE)
            .theme(BinaryColorTheme::OledBlue)
            .build();
        Self {
            frame: FrameBuffer::new(),
            display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
            window: Window::new("Thermo Simulator", &output_settings),
        }
    }

    fn handle_events(&mut self) {
        for event in self.window.events() {
            match event {
                SimulatorEvent::Quit
                | SimulatorEvent::KeyDown {
                    keycode: Keycode::Q | Keycode::Escape,
                    ..
                } => {
                    info!("Simulator exiting");
                    std::process::exit(0);
                }
                _ => {}
            }
        }
    }
}

impl OriginDimensions for SimulatorScreen {
    fn size(&self) -> Size {
        self.frame.size()
    }
}

impl DrawTarget for SimulatorScreen {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.frame.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.frame.clear(color)
    }
}

impl Screen for SimulatorScreen {
    async fn init(&mut self) -> Result<(), DisplayError> {
        // The SDL window is lazily created on the first `update()`, and
        // `events()` panics before that.
        self.window.update(&self.display);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DisplayError> {
        let Ok(()) = self.frame.flush(&mut self.display);
        self.window.update(&self.display);
        self.handle_events();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Synthetic readings that drift over time.
struct MockSensor {
    started: Instant,
}

impl MockSensor {
    fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Sensor for MockSensor {
    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let t = self.started.elapsed().as_secs_f64();

        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        // Humidity: 40–60 % with different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        Ok(Reading::new(temperature as f32, humidity as f32))
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Pretends to associate, reporting localhost after a few checks.
struct LoopbackLink {
    checks: Cell<u32>,
}

impl NetworkLink for LoopbackLink {
    async fn begin(&mut self, credentials: &Credentials) {
        info!("Simulating association with {}", credentials.ssid);
    }

    fn current_address(&self) -> Option<Ipv4Addr> {
        let checks = self.checks.get();
        self.checks.set(checks.saturating_add(1));
        (checks >= JOIN_DELAY_CHECKS).then_some(Ipv4Addr::LOCALHOST)
    }
}

/// Non-blocking accept on a `std` listener, blocking I/O once a client is in.
struct StdTransport {
    listener: Option<TcpListener>,
    client: Option<TcpStream>,
}

impl StdTransport {
    fn new() -> Self {
        Self {
            listener: None,
            client: None,
        }
    }

    fn client(&mut self) -> std::io::Result<&mut TcpStream> {
        self.client
            .as_mut()
            .ok_or_else(|| std::io::Error::from(ErrorKind::NotConnected))
    }
}

impl HttpTransport for StdTransport {
    type Error = std::io::Error;

    async fn listen(&mut self) {
        // The listener keeps accepting between clients.
        if self.listener.is_some() {
            return;
        }
        let bound = TcpListener::bind((Ipv4Addr::LOCALHOST, SIMULATOR_HTTP_PORT))
            .and_then(|listener| listener.set_nonblocking(true).map(|()| listener));
        match bound {
            Ok(listener) => {
                info!("Status page at http://127.0.0.1:{}/", SIMULATOR_HTTP_PORT);
                self.listener = Some(listener);
            }
            Err(e) => error!("Cannot listen on port {}: {}", SIMULATOR_HTTP_PORT, e),
        }
    }

    async fn poll_pending(&mut self) -> bool {
        let Some(listener) = &self.listener else {
            return false;
        };
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("Client {} connected", peer);
                let ready = stream
                    .set_nonblocking(false)
                    .and_then(|()| stream.set_read_timeout(Some(CLIENT_TIMEOUT)));
                if let Err(e) = ready {
                    error!("Cannot configure client socket: {}", e);
                    return false;
                }
                self.client = Some(stream);
                true
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                error!("Accept failed: {}", e);
                false
            }
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.client()?.read(buf)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.client()?.write_all(bytes)
    }

    async fn close(&mut self) {
        if let Some(stream) = self.client.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting thermo-rs simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );

    let parts = Parts {
        screen: SimulatorScreen::new(),
        sensor: MockSensor::new(),
        network: LoopbackLink {
            checks: Cell::new(0),
        },
        transport: StdTransport::new(),
        delay: StdDelay,
        credentials: Credentials::new("simulated", ""),
    };

    block_on(async {
        match bring_up_or_report(parts).await {
            Ok(device) => device.run().await,
            Err(_) => std::process::exit(1),
        }
    })
}
