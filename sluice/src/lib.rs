//! # Sluice
//!
//! ZeroMQ-style messaging sockets over ZMTP 3.1, built on `compio`.
//!
//! ## Architecture
//!
//! - **`sluice-core`**: endpoints, socket types, options, retry state, monitoring
//! - **`sluice-zmtp`**: ZMTP framing, greeting, NULL handshake and sessions
//! - **`sluice`**: socket core, connection registry and socket patterns (this crate)
//!
//! ## Socket Patterns
//!
//! | Connects | Binds | Framing |
//! |----------|-------|---------|
//! | `CLIENT` | `SERVER` | one frame per message |
//! | `DEALER` | `ROUTER` | multipart, ROUTER prefixes the peer key |
//! | `PULL` | `PUSH` | one frame per message |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice::zmq::prelude::*;
//!
//! # async fn example() -> sluice::Result<()> {
//! let router = RouterSocket::new(SecurityMechanism::Null, "broker");
//! router.bind_many("tcp://127.0.0.1:5555").await?;
//!
//! let dealer = DealerSocket::with_identity(SecurityMechanism::Null, "worker-1");
//! dealer.connect("tcp://127.0.0.1:5555").await?;
//! dealer.send_multipart_str(&["", "HELLO"]).await?;
//!
//! // [b"worker-1", b"", b"HELLO"]
//! let request = router.recv_multipart().await?;
//! router.send_multipart_str(&["worker-1", "", "WORLD"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime
//!
//! Sockets are single-threaded: connection delivery tasks and accept loops
//! are spawned on the current `compio` runtime.

#![warn(clippy::all)]

pub mod dev_tracing;
pub mod error;
pub mod socket;
pub mod zmq;

pub use bytes::Bytes;
pub use error::{Error, Result};
pub use socket::{Connection, Socket};

pub use sluice_core::endpoint::{Endpoint, EndpointError, Transport};
pub use sluice_core::monitor::{SocketEvent, SocketMonitor};
pub use sluice_core::options::SocketOptions;
pub use sluice_core::socket_type::SocketType;
pub use sluice_zmtp::{Message, MessageKind, SecurityMechanism, ZmtpError};
