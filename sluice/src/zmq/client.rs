//! CLIENT socket implementation.

use super::Connector;
use sluice_core::socket_type::SocketType;

zmq_socket!(
    /// A CLIENT socket for single-frame request-reply.
    ///
    /// CLIENT connects to a SERVER and exchanges one frame per message.
    /// Incoming multipart data is delivered frame by frame.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use sluice::zmq::prelude::*;
    ///
    /// # async fn example() -> sluice::Result<()> {
    /// let client = ClientSocket::new(SecurityMechanism::Null);
    /// client.connect("tcp://127.0.0.1:5555").await?;
    ///
    /// client.send(Bytes::from_static(b"HELLO")).await?;
    /// let reply = client.recv().await?;
    /// # Ok(())
    /// # }
    /// ```
    ClientSocket,
    SocketType::Client
);
anonymous_constructors!(ClientSocket);

impl Connector for ClientSocket {}
