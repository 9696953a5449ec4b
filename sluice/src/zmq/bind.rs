//! Bind orchestration (SERVER, ROUTER, PUSH).

use crate::error::{Error, Result};
use crate::socket::{Connection, Socket};
use crate::zmq::connect::prepare;
use crate::zmq::ZmqSocket;
use compio::net::TcpStream;
use futures::future::{AbortHandle, Abortable};
use sluice_core::endpoint::Endpoint;
use sluice_core::monitor::SocketEvent;
use sluice_core::socket_type::SocketType;
use sluice_zmtp::transport::{self, Listener};
use sluice_zmtp::{DeliveryMode, ZmtpSession};
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Listen on `endpoint`, accept exactly one peer, handshake and register it.
///
/// Returns the accepted stream's local address. The listener is dropped
/// once the peer is accepted.
pub async fn bind<S>(socket: &S, endpoint: &str) -> Result<SocketAddr>
where
    S: ZmqSocket + ?Sized,
{
    let core = socket.core();
    let (listener, endpoint) = open_listener(core, endpoint).await?;

    let (stream, peer) = core.until_closed(listener.accept()).await??;
    drop(listener);
    debug!("[BIND] Accepted {} on {}", peer, endpoint);

    register_accepted(core, &endpoint, stream).await
}

/// Listen on `endpoint` and keep accepting peers until the socket closes.
///
/// Each accepted stream is handshaked and registered on its own task;
/// failures are logged and do not stop the accept loop. Returns the
/// listener's bound address.
pub async fn bind_many<S>(socket: &S, endpoint: &str) -> Result<SocketAddr>
where
    S: ZmqSocket + ?Sized,
{
    let core = Arc::clone(socket.core());
    let (listener, endpoint) = open_listener(&core, endpoint).await?;
    let local_addr = listener.local_addr()?;

    let (handle, registration) = AbortHandle::new_pair();
    let accept_loop = accept_loop(Arc::downgrade(&core), listener, endpoint);
    compio::runtime::spawn(Abortable::new(accept_loop, registration)).detach();
    core.track_listener(handle);

    Ok(local_addr)
}

async fn open_listener(core: &Socket, endpoint: &str) -> Result<(Listener, Endpoint)> {
    if core.is_closed() {
        return Err(Error::Closed);
    }
    let endpoint = Endpoint::parse(endpoint)?;
    let listener = transport::listen(&endpoint, core.options().tcp_nodelay).await?;
    let local_addr = listener.local_addr()?;

    info!("[BIND] {} listening on {}", core.socket_type(), local_addr);
    core.emit(SocketEvent::Listening(local_addr));
    Ok((listener, endpoint))
}

/// Holds the socket weakly so an abandoned socket can still drop (and
/// close, which aborts this loop).
async fn accept_loop(core: Weak<Socket>, listener: Listener, endpoint: Endpoint) {
    loop {
        let accepted = listener.accept().await;
        let Some(core) = core.upgrade() else {
            break;
        };
        match accepted {
            Ok((stream, peer)) => {
                debug!("[BIND] Accepted {} on {}", peer, endpoint);
                let endpoint = endpoint.clone();
                compio::runtime::spawn(async move {
                    if let Err(e) = register_accepted(&core, &endpoint, stream).await {
                        warn!("[BIND] Dropping peer {}: {}", peer, e);
                    }
                })
                .detach();
            }
            Err(e) => {
                warn!("[BIND] Accept on {} failed: {}", endpoint, e);
                compio::time::sleep(core.retry_interval()).await;
            }
        }
    }
}

/// Handshake an accepted stream and register it.
///
/// ROUTER registers under the identity the peer declared (a generated key
/// when it declared none) and prefixes delivered messages with that key.
async fn register_accepted(
    core: &Socket,
    endpoint: &Endpoint,
    stream: TcpStream,
) -> Result<SocketAddr> {
    let local_addr = stream.local_addr()?;
    let session = ZmtpSession::new(stream).with_max_msg_size(core.options().max_msg_size);

    let peer = match core.until_closed(prepare(core, &session, true)).await? {
        Ok(peer) => peer,
        Err(source) => {
            warn!("[BIND] Handshake on {} failed: {}", local_addr, source);
            core.emit(SocketEvent::HandshakeFailed {
                endpoint: endpoint.clone(),
                reason: source.to_string(),
            });
            return Err(Error::Handshake {
                local_addr: Some(local_addr),
                source,
            });
        }
    };

    let conn = Arc::new(Connection::new(session));
    let socket_type = core.socket_type();
    let (key, prefix) = if socket_type == SocketType::Router {
        let identity = peer.identity().cloned().unwrap_or_default();
        let key = core.add_connection_with_key(Arc::clone(&conn), identity)?;
        (key.clone(), Some(key))
    } else {
        (core.add_connection(Arc::clone(&conn))?, None)
    };

    conn.attach(core.recv_channel(), DeliveryMode::for_socket(socket_type), prefix);

    info!("[BIND] {} accepted peer as {:?}", socket_type, key);
    core.emit(SocketEvent::Accepted { local_addr, key });
    Ok(local_addr)
}
