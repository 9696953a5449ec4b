//! PULL socket implementation.

use super::Connector;
use sluice_core::socket_type::SocketType;

zmq_socket!(
    /// A PULL socket, the connecting end of a pipeline.
    ///
    /// PULL dials a binding PUSH peer. The link carries frames both ways.
    PullSocket,
    SocketType::Pull
);
anonymous_constructors!(PullSocket);

impl Connector for PullSocket {}
