//! DEALER socket implementation.

use super::Connector;
use sluice_core::socket_type::SocketType;

zmq_socket!(
    /// A DEALER socket for asynchronous request-reply.
    ///
    /// DEALER advertises its identity during the handshake so a ROUTER
    /// peer can address it. Messages travel as whole frame sequences.
    ///
    /// ## ZeroMQ Compatibility
    ///
    /// Talks to ROUTER peers. Prepend an empty delimiter frame when the
    /// ROUTER side expects REQ-style envelopes.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use sluice::zmq::prelude::*;
    ///
    /// # async fn example() -> sluice::Result<()> {
    /// let dealer = DealerSocket::with_identity(SecurityMechanism::Null, "worker-1");
    /// dealer.connect("tcp://127.0.0.1:5555").await?;
    ///
    /// dealer.send_multipart_str(&["", "REQUEST"]).await?;
    /// let reply = dealer.recv_multipart().await?;
    /// # Ok(())
    /// # }
    /// ```
    DealerSocket,
    SocketType::Dealer
);
anonymous_constructors!(DealerSocket);

impl Connector for DealerSocket {}
