//! Status server loop body
//!
//! The server never waits for a client. Each call to
//! [`StatusServer::serve_pending`] answers at most one connection that is
//! already established and returns immediately otherwise.

use crate::http::{self, Route, StatusPage};
use crate::network::Joined;

/// Bytes kept of an incoming request head.
pub const REQUEST_BUFFER_LEN: usize = 1024;

/// A single-connection TCP listener.
pub trait HttpTransport {
    type Error: core::fmt::Debug;

    /// Accept connections on the configured port.
    ///
    /// Called at start and again after every closed connection, so the port
    /// is never left refusing clients between cycles. Must be harmless when
    /// already listening.
    fn listen(&mut self) -> impl Future<Output = ()>;

    /// Whether a client connection is established and ready to be read.
    ///
    /// Must return without waiting when no client is connected.
    fn poll_pending(&mut self) -> impl Future<Output = bool>;

    /// Read from the pending connection. `Ok(0)` means the peer closed.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;

    fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Close the pending connection.
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// A listening socket's state as seen between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Not listening.
    Idle,
    /// Listening, or a handshake is still in flight.
    Connecting,
    Connected,
    /// The peer finished sending. `readable` if its request is still buffered.
    HalfClosed { readable: bool },
    /// Any other teardown state.
    Closing,
}

/// What a transport should do with its socket when polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// A request is waiting; report it as pending.
    Serve,
    Wait,
    /// Put the socket back into listening.
    Relisten,
    /// Drop the dead connection, then listen again.
    Discard,
}

pub fn poll_action(state: SocketState) -> PollAction {
    match state {
        SocketState::Connected | SocketState::HalfClosed { readable: true } => PollAction::Serve,
        SocketState::Connecting => PollAction::Wait,
        SocketState::Idle => PollAction::Relisten,
        SocketState::HalfClosed { readable: false } | SocketState::Closing => PollAction::Discard,
    }
}

pub struct StatusServer<T> {
    transport: T,
    served: u32,
}

impl<T: HttpTransport> StatusServer<T> {
    /// Start listening. Requires a completed network association.
    pub async fn start(mut transport: T, _joined: &Joined) -> Self {
        transport.listen().await;
        Self {
            transport,
            served: 0,
        }
    }

    /// Answer the connection that is already waiting, if any.
    ///
    /// Returns the route that was answered. Read, write and parse failures
    /// drop the connection without a response.
    pub async fn serve_pending(&mut self, page: &StatusPage) -> Option<Route> {
        if !self.transport.poll_pending().await {
            return None;
        }

        let mut buf = [0u8; REQUEST_BUFFER_LEN];
        let answered = match read_head(&mut self.transport, &mut buf).await {
            Some(len) => match http::handle(&buf[..len], page) {
                Ok((route, response)) => self
                    .transport
                    .write_all(response.as_bytes())
                    .await
                    .ok()
                    .map(|_| route),
                Err(_) => None,
            },
            None => None,
        };

        self.transport.close().await;
        self.transport.listen().await;
        if answered.is_some() {
            self.served = self.served.wrapping_add(1);
        }
        answered
    }

    /// Number of requests answered since start.
    pub fn served(&self) -> u32 {
        self.served
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

/// Read until the end of the request head or until `buf` is full.
async fn read_head<T: HttpTransport>(transport: &mut T, buf: &mut [u8]) -> Option<usize> {
    let mut len = 0;
    while len < buf.len() {
        match transport.read(&mut buf[len..]).await {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(_) => return None,
        }
        if buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    (len > 0).then_some(len)
}
