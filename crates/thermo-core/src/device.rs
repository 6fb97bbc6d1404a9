//! The sense-display-serve cycle
//!
//! One task, one fixed order: read the sensor, record the value, redraw the
//! screen, answer whatever request is already waiting, sleep.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;

use crate::app_state::AppState;
use crate::config::CYCLE_PERIOD;
use crate::display::{self, Screen};
use crate::http::{Route, StatusPage};
use crate::network::NetworkLink;
use crate::sensors::Sensor;
use crate::server::{HttpTransport, StatusServer};

/// A fully initialized station. Built by [`crate::startup::bring_up`].
pub struct Device<S, D, N, T, Dl> {
    sensor: S,
    screen: D,
    network: N,
    server: StatusServer<T>,
    delay: Dl,
    state: AppState,
}

impl<S, D, N, T, Dl> Device<S, D, N, T, Dl>
where
    S: Sensor,
    D: Screen,
    N: NetworkLink,
    T: HttpTransport,
    Dl: DelayNs,
{
    pub(crate) fn new(sensor: S, screen: D, network: N, server: StatusServer<T>, delay: Dl) -> Self {
        Self {
            sensor,
            screen,
            network,
            server,
            delay,
            state: AppState::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn server(&self) -> &StatusServer<T> {
        &self.server
    }

    /// Run one sense-display-serve pass without the trailing sleep.
    ///
    /// Returns the route answered in this pass, if a client was waiting.
    pub async fn cycle(&mut self) -> Option<Route> {
        // Read failures are recorded as-is; see `AppState::record`.
        let reading = self.sensor.read().await;
        self.state.record(reading);

        let temperature = self.state.temperature();
        let _ = display::redraw(&mut self.screen, temperature).await;

        let address = self
            .network
            .current_address()
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        self.server
            .serve_pending(&StatusPage::new(temperature, address))
            .await
    }

    /// Cycle forever.
    pub async fn run(mut self) -> ! {
        loop {
            self.cycle().await;
            self.delay.delay_ms(CYCLE_PERIOD.as_millis() as u32).await;
        }
    }
}
