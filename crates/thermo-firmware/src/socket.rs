//! [`HttpTransport`] over a single embassy-net TCP socket.
//!
//! The socket is created on first use, once [`WifiLink`](crate::wifi::WifiLink)
//! has published the network stack. It is put into the listening state
//! without awaiting the accept; each poll then just inspects the TCP state
//! machine, so a cycle with no client costs nothing.

use core::task::Poll;

use embassy_futures::poll_once;
use embassy_net::tcp::{Error, State, TcpSocket};
use embassy_time::Duration;
use embedded_io_async::Write;
use log::debug;
use thermo_core::server::{HttpTransport, PollAction, SocketState, poll_action};

use crate::wifi::StackSlot;

/// Inactivity limit for a connected client.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SocketTransport<'a> {
    stack: &'a StackSlot,
    buffers: Option<(&'static mut [u8], &'static mut [u8])>,
    socket: Option<TcpSocket<'static>>,
    port: u16,
}

impl<'a> SocketTransport<'a> {
    pub fn new(
        stack: &'a StackSlot,
        rx_buffer: &'static mut [u8],
        tx_buffer: &'static mut [u8],
        port: u16,
    ) -> Self {
        Self {
            stack,
            buffers: Some((rx_buffer, tx_buffer)),
            socket: None,
            port,
        }
    }

    /// `None` until the network stack exists.
    fn socket(&mut self) -> Option<&mut TcpSocket<'static>> {
        if self.socket.is_none() {
            let stack = self.stack.get()?;
            let (rx_buffer, tx_buffer) = self.buffers.take()?;
            let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
            socket.set_timeout(Some(CLIENT_TIMEOUT));
            self.socket = Some(socket);
        }
        self.socket.as_mut()
    }

    fn start_accepting(&mut self) {
        let port = self.port;
        let Some(socket) = self.socket() else {
            return;
        };
        if socket.state() != State::Closed {
            return;
        }
        if let Poll::Ready(Err(e)) = poll_once(socket.accept(port)) {
            debug!("Listen on port {} failed: {:?}", port, e);
        }
    }

    fn socket_state(&mut self) -> SocketState {
        let Some(socket) = self.socket() else {
            return SocketState::Idle;
        };
        match socket.state() {
            State::Closed => SocketState::Idle,
            State::Listen | State::SynReceived | State::SynSent => SocketState::Connecting,
            State::Established => SocketState::Connected,
            State::CloseWait => SocketState::HalfClosed {
                readable: socket.can_recv(),
            },
            _ => SocketState::Closing,
        }
    }
}

impl HttpTransport for SocketTransport<'_> {
    type Error = Error;

    async fn listen(&mut self) {
        self.start_accepting();
    }

    async fn poll_pending(&mut self) -> bool {
        match poll_action(self.socket_state()) {
            PollAction::Serve => true,
            PollAction::Wait => false,
            PollAction::Relisten => {
                self.start_accepting();
                false
            }
            PollAction::Discard => {
                if let Some(socket) = self.socket() {
                    socket.abort();
                }
                self.start_accepting();
                false
            }
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.socket() {
            Some(socket) => socket.read(buf).await,
            None => Err(Error::ConnectionReset),
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        match self.socket() {
            Some(socket) => Write::write_all(socket, bytes).await,
            None => Err(Error::ConnectionReset),
        }
    }

    async fn close(&mut self) {
        let Some(socket) = self.socket() else {
            return;
        };
        socket.close();
        if let Err(e) = socket.flush().await {
            debug!("Flush on close failed: {:?}", e);
        }
        // Skips TIME-WAIT so the port can listen again right away.
        socket.abort();
    }
}
