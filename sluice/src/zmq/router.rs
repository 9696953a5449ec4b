//! ROUTER socket implementation.

use super::Binder;
use bytes::Bytes;
use sluice_core::options::SocketOptions;
use sluice_core::socket_type::SocketType;
use sluice_zmtp::SecurityMechanism;

zmq_socket!(
    /// A ROUTER socket for identity-based routing.
    ///
    /// Each accepted peer is registered under the identity it declared
    /// during the handshake, or a generated key when it declared none.
    ///
    /// ## Message Format
    ///
    /// **Incoming**: `[identity, ...peer_frames]`\
    /// **Outgoing**: `[identity, ...frames]` (sent to that peer only)
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use sluice::zmq::prelude::*;
    ///
    /// # async fn example() -> sluice::Result<()> {
    /// let router = RouterSocket::new(SecurityMechanism::Null, "broker");
    /// router.bind_many("tcp://127.0.0.1:5555").await?;
    ///
    /// loop {
    ///     let msg = router.recv_multipart().await?;
    ///     // msg[0] = identity, msg[1] = delimiter, msg[2..] = payload
    ///     router.send_multipart(msg).await?;
    /// }
    /// # }
    /// ```
    RouterSocket,
    SocketType::Router
);

impl RouterSocket {
    pub fn new(mechanism: SecurityMechanism, identity: impl Into<Bytes>) -> Self {
        Self::from_parts(mechanism, identity.into(), SocketOptions::default())
    }

    pub fn with_options(
        mechanism: SecurityMechanism,
        identity: impl Into<Bytes>,
        options: SocketOptions,
    ) -> Self {
        Self::from_parts(mechanism, identity.into(), options)
    }
}

impl Binder for RouterSocket {}
