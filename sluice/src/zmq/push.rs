//! PUSH socket implementation.

use super::Binder;
use sluice_core::socket_type::SocketType;

zmq_socket!(
    /// A PUSH socket, the binding end of a pipeline.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use sluice::zmq::prelude::*;
    ///
    /// # async fn example() -> sluice::Result<()> {
    /// let push = PushSocket::new(SecurityMechanism::Null);
    /// push.bind("tcp://127.0.0.1:5557").await?;
    /// push.send(Bytes::from_static(b"task")).await?;
    /// # Ok(())
    /// # }
    /// ```
    PushSocket,
    SocketType::Push
);
anonymous_constructors!(PushSocket);

impl Binder for PushSocket {}
