//! ZeroMQ socket patterns.
//!
//! # Socket Types
//!
//! - [`ClientSocket`] / [`ServerSocket`] - single-frame request-reply
//! - [`DealerSocket`] / [`RouterSocket`] - multipart, identity-routed
//! - [`PushSocket`] / [`PullSocket`] - pipeline
//!
//! Every variant is a thin wrapper over the shared [`Socket`] core and
//! implements [`ZmqSocket`]. Connecting variants (CLIENT, DEALER, PULL)
//! implement [`Connector`]; binding variants (SERVER, ROUTER, PUSH)
//! implement [`Binder`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sluice::zmq::prelude::*;
//!
//! #[compio::main]
//! async fn main() -> sluice::Result<()> {
//!     let client = ClientSocket::new(SecurityMechanism::Null);
//!     client.connect("tcp://127.0.0.1:9999").await?;
//!
//!     client.send(Bytes::from_static(b"HELLO")).await?;
//!     let reply = client.recv().await?;
//!     println!("Got reply: {:?}", reply);
//!     Ok(())
//! }
//! ```

pub mod bind;
pub mod connect;

use crate::error::Result;
use crate::socket::{Connection, Socket};
use bytes::Bytes;
use sluice_core::monitor::SocketMonitor;
use sluice_core::options::SocketOptions;
use sluice_core::socket_type::SocketType;
use sluice_zmtp::{Message, SecurityMechanism};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Uniform contract shared by every socket pattern.
///
/// Implementors only provide [`core`](Self::core); everything else
/// forwards to the shared [`Socket`].
#[async_trait::async_trait(?Send)]
pub trait ZmqSocket {
    /// The socket core this variant wraps.
    fn core(&self) -> &Arc<Socket>;

    async fn recv(&self) -> Result<Bytes> {
        self.core().recv().await
    }

    async fn recv_multipart(&self) -> Result<Vec<Bytes>> {
        self.core().recv_multipart().await
    }

    async fn send(&self, payload: Bytes) -> Result<()> {
        self.core().send(payload).await
    }

    async fn send_multipart(&self, frames: Vec<Bytes>) -> Result<()> {
        self.core().send_multipart(frames).await
    }

    async fn send_multipart_str(&self, parts: &[&str]) -> Result<()> {
        self.core().send_multipart_str(parts).await
    }

    fn add_connection(&self, conn: Arc<Connection>) -> Result<Bytes> {
        self.core().add_connection(conn)
    }

    fn add_connection_with_key(&self, conn: Arc<Connection>, key: Bytes) -> Result<Bytes> {
        self.core().add_connection_with_key(conn, key)
    }

    fn remove_connection(&self, key: &[u8]) {
        self.core().remove_connection(key);
    }

    fn connection_count(&self) -> usize {
        self.core().connection_count()
    }

    fn connection_keys(&self) -> Vec<Bytes> {
        self.core().connection_keys()
    }

    fn socket_type(&self) -> SocketType {
        self.core().socket_type()
    }

    fn identity(&self) -> &Bytes {
        self.core().identity()
    }

    fn security_mechanism(&self) -> SecurityMechanism {
        self.core().security_mechanism()
    }

    fn retry_interval(&self) -> Duration {
        self.core().retry_interval()
    }

    fn set_retry_interval(&self, interval: Duration) {
        self.core().set_retry_interval(interval);
    }

    fn options(&self) -> SocketOptions {
        self.core().options()
    }

    fn recv_channel(&self) -> flume::Sender<Message> {
        self.core().recv_channel()
    }

    fn monitor(&self) -> SocketMonitor {
        self.core().monitor()
    }

    fn close(&self) {
        self.core().close();
    }
}

/// Sockets that dial out.
#[async_trait::async_trait(?Send)]
pub trait Connector: ZmqSocket {
    /// Connect to `scheme://address`, retrying the dial until it succeeds.
    async fn connect(&self, endpoint: &str) -> Result<()> {
        connect::connect(self, endpoint).await
    }
}

/// Sockets that listen.
#[async_trait::async_trait(?Send)]
pub trait Binder: ZmqSocket {
    /// Accept a single peer on `scheme://address`.
    async fn bind(&self, endpoint: &str) -> Result<SocketAddr> {
        bind::bind(self, endpoint).await
    }

    /// Accept peers on `scheme://address` until the socket closes.
    async fn bind_many(&self, endpoint: &str) -> Result<SocketAddr> {
        bind::bind_many(self, endpoint).await
    }
}

/// Define a pattern variant: struct, constructors and [`ZmqSocket`] impl.
macro_rules! zmq_socket {
    ($(#[$meta:meta])* $name:ident, $socket_type:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            core: std::sync::Arc<$crate::socket::Socket>,
        }

        impl $name {
            fn from_parts(
                mechanism: sluice_zmtp::SecurityMechanism,
                identity: bytes::Bytes,
                options: sluice_core::options::SocketOptions,
            ) -> Self {
                Self {
                    core: std::sync::Arc::new($crate::socket::Socket::new(
                        $socket_type,
                        mechanism,
                        identity,
                        options,
                    )),
                }
            }
        }

        impl $crate::zmq::ZmqSocket for $name {
            fn core(&self) -> &std::sync::Arc<$crate::socket::Socket> {
                &self.core
            }
        }
    };
}

/// Constructors for variants whose identity is optional.
macro_rules! anonymous_constructors {
    ($name:ident) => {
        impl $name {
            /// New socket with no identity and default options.
            pub fn new(mechanism: sluice_zmtp::SecurityMechanism) -> Self {
                Self::from_parts(mechanism, bytes::Bytes::new(), Default::default())
            }

            /// New socket advertising `identity` to its peers.
            pub fn with_identity(
                mechanism: sluice_zmtp::SecurityMechanism,
                identity: impl Into<bytes::Bytes>,
            ) -> Self {
                Self::from_parts(mechanism, identity.into(), Default::default())
            }

            /// New socket with explicit options.
            pub fn with_options(
                mechanism: sluice_zmtp::SecurityMechanism,
                identity: impl Into<bytes::Bytes>,
                options: sluice_core::options::SocketOptions,
            ) -> Self {
                Self::from_parts(mechanism, identity.into(), options)
            }
        }
    };
}

mod client;
mod dealer;
mod pull;
mod push;
mod router;
mod server;

pub use client::ClientSocket;
pub use dealer::DealerSocket;
pub use pull::PullSocket;
pub use push::PushSocket;
pub use router::RouterSocket;
pub use server::ServerSocket;

/// Convenient imports for the socket patterns.
pub mod prelude {
    pub use super::{
        Binder, ClientSocket, Connector, DealerSocket, PullSocket, PushSocket, RouterSocket,
        ServerSocket, ZmqSocket,
    };
    pub use crate::error::{Error, Result};
    pub use bytes::Bytes;
    pub use sluice_core::options::SocketOptions;
    pub use sluice_zmtp::SecurityMechanism;
}
