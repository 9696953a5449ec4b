//! Stream transports.
//!
//! Endpoints are dispatched on their scheme; only TCP is provided.

use compio::net::{TcpListener, TcpStream};
use sluice_core::endpoint::{Endpoint, Transport};
use sluice_core::tcp::set_tcp_nodelay;
use std::io;
use std::net::SocketAddr;
use tracing::{debug, warn};

/// Dial an endpoint.
pub async fn dial(endpoint: &Endpoint, nodelay: bool) -> io::Result<TcpStream> {
    match endpoint.transport() {
        Transport::Tcp => {
            let stream = TcpStream::connect(endpoint.address()).await?;
            tune(&stream, nodelay);
            Ok(stream)
        }
    }
}

/// Start listening on an endpoint.
pub async fn listen(endpoint: &Endpoint, nodelay: bool) -> io::Result<Listener> {
    match endpoint.transport() {
        Transport::Tcp => {
            let inner = TcpListener::bind(endpoint.address()).await?;
            debug!("[TRANSPORT] Listening on {:?}", inner.local_addr().ok());
            Ok(Listener { inner, nodelay })
        }
    }
}

/// A bound listener.
pub struct Listener {
    inner: TcpListener,
    nodelay: bool,
}

impl Listener {
    /// Accept the next incoming stream.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.inner.accept().await?;
        tune(&stream, self.nodelay);
        Ok((stream, peer))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

fn tune(stream: &TcpStream, nodelay: bool) {
    if let Err(e) = set_tcp_nodelay(stream, nodelay) {
        warn!("[TRANSPORT] Failed to set TCP_NODELAY: {}", e);
    }
}
