//! Sluice error types.

use bytes::Bytes;
use sluice_core::endpoint::EndpointError;
use sluice_zmtp::ZmtpError;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Main error type for socket operations
#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint string could not be parsed
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    /// Dial, listen or accept failed
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Greeting or security handshake failed
    #[error("Handshake failed: {source}")]
    Handshake {
        /// Local address of the accepted stream, when one was accepted
        local_addr: Option<SocketAddr>,
        source: ZmtpError,
    },

    /// Session-level failure while sending
    #[error("Session error: {0}")]
    Session(#[from] ZmtpError),

    /// The delivery loop reported an error; `partial` holds any frames
    /// received before it
    #[error("Receive failed: {source}")]
    Recv { partial: Vec<Bytes>, source: ZmtpError },

    /// ROUTER send addressed to an unknown peer
    #[error("Router destination not found: {0:?}")]
    RouterDestinationNotFound(Bytes),

    /// ROUTER send without a destination frame or without payload
    #[error("Invalid multipart message for ROUTER: destination frame followed by payload required")]
    InvalidRouterMultipart,

    /// No registered connection to send on
    #[error("No connection available")]
    NoConnection,

    /// OS randomness unavailable while generating a connection key
    #[error("Failed to generate connection key: {0}")]
    KeyGeneration(#[source] rand::Error),

    /// A connection with this key is already registered
    #[error("Connection key already registered: {0:?}")]
    DuplicateKey(Bytes),

    /// `max_connect_attempts` dial attempts all failed
    #[error("Gave up connecting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Receive or send timeout elapsed
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The socket was closed
    #[error("Socket closed")]
    Closed,

    /// The connection was already closed
    #[error("Connection already closed")]
    ConnectionClosed,
}

/// Result type alias for socket operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error came from a closed socket or connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::ConnectionClosed)
    }

    /// Frames received before a delivery error, if any.
    pub fn partial_body(&self) -> Option<&[Bytes]> {
        match self {
            Self::Recv { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
