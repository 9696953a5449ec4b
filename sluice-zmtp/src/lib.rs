//! # Sluice ZMTP
//!
//! ZMTP 3.1 session layer for `sluice` sockets.
//!
//! ## Overview
//!
//! - **codec**: frame encoder and incremental decoder
//! - **greeting**: the fixed 64-byte greeting
//! - **command**: READY / ERROR / PING / PONG and peer metadata
//! - **mechanism**: security mechanism trait and the NULL mechanism
//! - **session**: `ZmtpSession` (handshake, sends, delivery loop)
//! - **transport**: TCP dial and listen
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice_core::endpoint::Endpoint;
//! use sluice_core::socket_type::SocketType;
//! use sluice_zmtp::prelude::*;
//! use bytes::Bytes;
//!
//! #[compio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Endpoint::parse("tcp://127.0.0.1:5555")?;
//!     let stream = sluice_zmtp::transport::dial(&endpoint, true).await?;
//!     let session = ZmtpSession::new(stream);
//!
//!     let peer = session
//!         .prepare(SecurityMechanism::Null, SocketType::Client, b"", false, &PeerMetadata::new())
//!         .await?;
//!     println!("peer is {:?}", peer.socket_type());
//!
//!     session.send_frame(Bytes::from_static(b"HELLO")).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod codec;
pub mod command;
pub mod greeting;
pub mod mechanism;
pub mod message;
pub mod multipart;
pub mod session;
pub mod transport;

pub use codec::ZmtpError;
pub use command::PeerMetadata;
pub use mechanism::SecurityMechanism;
pub use message::{Message, MessageKind};
pub use session::{DeliveryMode, ZmtpSession};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::codec::ZmtpError;
    pub use super::command::PeerMetadata;
    pub use super::mechanism::SecurityMechanism;
    pub use super::message::{Message, MessageKind};
    pub use super::session::{DeliveryMode, ZmtpSession};
    pub use bytes::Bytes;
}
