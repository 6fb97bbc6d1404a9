//! Start-up sequencing
//!
//! Brings the pieces up strictly in order: display, sensor, network, status
//! server. A peripheral that fails to come up stops the sequence on the spot;
//! nothing after it is touched.

use embedded_hal_async::delay::DelayNs;
use log::{error, info};

use crate::app_state::StartupError;
use crate::config::Credentials;
use crate::device::Device;
use crate::display::{self, Screen};
use crate::network::{self, NetworkLink};
use crate::sensors::Sensor;
use crate::server::{HttpTransport, StatusServer};

/// Everything the device is assembled from, not yet initialized.
pub struct Parts<S, D, N, T, Dl> {
    pub screen: D,
    pub sensor: S,
    pub network: N,
    pub transport: T,
    pub delay: Dl,
    pub credentials: Credentials,
}

/// Run the start-up sequence and hand back a device ready to cycle.
pub async fn bring_up<S, D, N, T, Dl>(
    parts: Parts<S, D, N, T, Dl>,
) -> Result<Device<S, D, N, T, Dl>, StartupError>
where
    S: Sensor,
    D: Screen,
    N: NetworkLink,
    T: HttpTransport,
    Dl: DelayNs,
{
    let Parts {
        mut screen,
        mut sensor,
        mut network,
        transport,
        mut delay,
        credentials,
    } = parts;

    // Failures are reported once, by `bring_up_or_report`.
    screen
        .init()
        .await
        .map_err(|_| StartupError::DisplayNotFound)?;
    // A blank screen is cosmetic; a failure here shows up on the first redraw.
    let _ = display::blank(&mut screen).await;
    info!("Display ready");

    sensor
        .init()
        .await
        .map_err(|_| StartupError::SensorNotFound)?;
    info!("Sensor ready");

    let joined = network::join_until_connected(&mut network, &mut delay, &credentials).await;

    let server = StatusServer::start(transport, &joined).await;
    info!("HTTP server started on {}", joined.address());

    Ok(Device::new(sensor, screen, network, server, delay))
}

/// [`bring_up`], reporting a failure once on the log.
///
/// The caller decides how to stop; nothing else is logged for the failure.
pub async fn bring_up_or_report<S, D, N, T, Dl>(
    parts: Parts<S, D, N, T, Dl>,
) -> Result<Device<S, D, N, T, Dl>, StartupError>
where
    S: Sensor,
    D: Screen,
    N: NetworkLink,
    T: HttpTransport,
    Dl: DelayNs,
{
    bring_up(parts).await.inspect_err(|e| error!("{}", e))
}
