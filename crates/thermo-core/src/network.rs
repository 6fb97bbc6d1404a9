//! WiFi association
//!
//! Joining the configured network has no failure path: the link is checked
//! once a second, forever, until it reports an address.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use log::info;

use crate::config::{Credentials, JOIN_RETRY_INTERVAL};

/// A station-mode network interface.
pub trait NetworkLink {
    /// Start associating with the network named in `credentials`.
    ///
    /// Called once. Association proceeds in the background; progress is
    /// observed through [`NetworkLink::current_address`].
    fn begin(&mut self, credentials: &Credentials) -> impl Future<Output = ()>;

    /// The address assigned to this device, if the link is up.
    fn current_address(&self) -> Option<Ipv4Addr>;
}

/// Proof that the network association completed.
///
/// Only [`join_until_connected`] hands these out, which keeps the status
/// server from being started on a device without an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joined {
    address: Ipv4Addr,
    attempts: u32,
}

impl Joined {
    /// Address assigned when the association completed.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Number of failed checks before the link came up.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[cfg(test)]
    pub(crate) fn assume(address: Ipv4Addr) -> Self {
        Self {
            address,
            attempts: 0,
        }
    }
}

/// Block until `link` is associated and has an address.
///
/// The link is checked immediately and then every [`JOIN_RETRY_INTERVAL`].
/// Each failed check logs one progress line. There is no attempt cap.
pub async fn join_until_connected<L, D>(
    link: &mut L,
    delay: &mut D,
    credentials: &Credentials,
) -> Joined
where
    L: NetworkLink,
    D: DelayNs,
{
    info!("Connecting to WiFi network \"{}\"", credentials.ssid);
    link.begin(credentials).await;

    let mut attempts: u32 = 0;
    loop {
        if let Some(address) = link.current_address() {
            info!("WiFi connected, address {}", address);
            return Joined { address, attempts };
        }

        attempts = attempts.saturating_add(1);
        delay.delay_ms(JOIN_RETRY_INTERVAL.as_millis() as u32).await;
        info!("Waiting for WiFi... ({})", attempts);
    }
}
