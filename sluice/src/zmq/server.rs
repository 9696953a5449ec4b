//! SERVER socket implementation.

use super::Binder;
use sluice_core::socket_type::SocketType;

zmq_socket!(
    /// A SERVER socket, the listening side of CLIENT.
    ///
    /// Replies go to the earliest-registered connection.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use sluice::zmq::prelude::*;
    ///
    /// # async fn example() -> sluice::Result<()> {
    /// let server = ServerSocket::new(SecurityMechanism::Null);
    /// server.bind("tcp://127.0.0.1:5555").await?;
    ///
    /// let request = server.recv().await?;
    /// server.send(Bytes::from_static(b"WORLD")).await?;
    /// # Ok(())
    /// # }
    /// ```
    ServerSocket,
    SocketType::Server
);
anonymous_constructors!(ServerSocket);

impl Binder for ServerSocket {}
