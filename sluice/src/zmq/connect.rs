//! Connect orchestration (CLIENT, DEALER, PULL).

use crate::error::{Error, Result};
use crate::socket::{Connection, Socket};
use crate::zmq::ZmqSocket;
use compio::net::TcpStream;
use sluice_core::endpoint::Endpoint;
use sluice_core::monitor::SocketEvent;
use sluice_core::reconnect::{RetryError, RetryState};
use sluice_zmtp::{transport, DeliveryMode, PeerMetadata, ZmtpError, ZmtpSession};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dial `endpoint`, handshake, register the connection and start delivery.
///
/// Dialing is retried at the socket's retry interval until it succeeds,
/// `max_connect_attempts` is reached, or the socket is closed. Handshake
/// failures are not retried.
pub async fn connect<S>(socket: &S, endpoint: &str) -> Result<()>
where
    S: ZmqSocket + ?Sized,
{
    let core = socket.core();
    let endpoint = Endpoint::parse(endpoint)?;

    let stream = dial_with_retry(core, &endpoint).await?;
    let session = ZmtpSession::new(stream).with_max_msg_size(core.options().max_msg_size);

    if let Err(source) = core.until_closed(prepare(core, &session, false)).await? {
        warn!("[CONNECT] Handshake with {} failed: {}", endpoint, source);
        core.emit(SocketEvent::HandshakeFailed {
            endpoint: endpoint.clone(),
            reason: source.to_string(),
        });
        return Err(Error::Handshake {
            local_addr: session.local_addr().ok(),
            source,
        });
    }

    let conn = Arc::new(Connection::new(session));
    let key = core.add_connection(Arc::clone(&conn))?;
    conn.attach(
        core.recv_channel(),
        DeliveryMode::for_socket(core.socket_type()),
        None,
    );

    info!("[CONNECT] {} connected to {} as {:?}", core.socket_type(), endpoint, key);
    core.emit(SocketEvent::Connected { endpoint, key });
    Ok(())
}

async fn dial_with_retry(core: &Socket, endpoint: &Endpoint) -> Result<TcpStream> {
    let mut retry = RetryState::new(&core.options());
    loop {
        let nodelay = core.options().tcp_nodelay;
        match core.until_closed(transport::dial(endpoint, nodelay)).await? {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                let attempt = retry.record_failure().map_err(|err| {
                    let RetryError::MaxAttemptsReached { attempts } = err;
                    warn!("[CONNECT] Giving up on {} after {} attempts: {}", endpoint, attempts, e);
                    Error::RetriesExhausted { attempts }
                })?;

                let interval = core.retry_interval();
                debug!(
                    "[CONNECT] Dial {} failed (attempt {}): {}; retrying in {:?}",
                    endpoint, attempt, e, interval
                );
                core.emit(SocketEvent::ConnectRetried {
                    endpoint: endpoint.clone(),
                    attempt,
                });
                core.until_closed(compio::time::sleep(interval)).await?;
            }
        }
    }
}

/// Handshake under the socket's handshake timeout.
pub(crate) async fn prepare(
    core: &Socket,
    session: &ZmtpSession,
    as_server: bool,
) -> std::result::Result<PeerMetadata, ZmtpError> {
    let extra = PeerMetadata::new();
    let handshake = session.prepare(
        core.security_mechanism(),
        core.socket_type(),
        core.identity(),
        as_server,
        &extra,
    );
    match core.options().handshake_deadline() {
        Some(limit) => compio::time::timeout(limit, handshake)
            .await
            .map_err(|_| ZmtpError::HandshakeTimeout)?,
        None => handshake.await,
    }
}
