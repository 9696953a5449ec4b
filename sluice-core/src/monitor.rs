//! Socket event monitoring.
//!
//! Provides event streams for tracking socket lifecycle events like
//! connections, retries, handshake failures and shutdown.

use crate::endpoint::Endpoint;
use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;

/// Socket lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A dialed connection finished its handshake and was registered.
    Connected { endpoint: Endpoint, key: Bytes },

    /// A dial attempt failed and will be retried.
    ConnectRetried { endpoint: Endpoint, attempt: u32 },

    /// Socket is listening for incoming connections.
    Listening(SocketAddr),

    /// An accepted connection finished its handshake and was registered.
    Accepted { local_addr: SocketAddr, key: Bytes },

    /// Handshake with a peer failed; the connection was dropped.
    HandshakeFailed { endpoint: Endpoint, reason: String },

    /// A connection was removed from the socket.
    Disconnected(Bytes),

    /// The socket was closed.
    Closed,
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { endpoint, key } => write!(f, "Connected to {endpoint} as {key:?}"),
            Self::ConnectRetried { endpoint, attempt } => {
                write!(f, "Connect to {endpoint} failed (attempt {attempt}), retrying")
            }
            Self::Listening(addr) => write!(f, "Listening on {addr}"),
            Self::Accepted { local_addr, key } => {
                write!(f, "Accepted connection on {local_addr} as {key:?}")
            }
            Self::HandshakeFailed { endpoint, reason } => {
                write!(f, "Handshake failed for {endpoint}: {reason}")
            }
            Self::Disconnected(key) => write!(f, "Disconnected {key:?}"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// Handle for receiving socket events.
pub type SocketMonitor = flume::Receiver<SocketEvent>;

/// Sender half used by sockets to emit events.
pub type SocketEventSender = flume::Sender<SocketEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn create_monitor() -> (SocketEventSender, SocketMonitor) {
    flume::unbounded()
}
