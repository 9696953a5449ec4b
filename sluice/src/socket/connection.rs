//! A registered peer: session plus its delivery task.

use crate::error::{Error, Result};
use crate::socket::registry::Closeable;
use bytes::Bytes;
use futures::future::{AbortHandle, Abortable};
use sluice_zmtp::{DeliveryMode, Message, ZmtpSession};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// One peer connection owned by a socket.
///
/// The session owns the transport stream. Closing cancels the delivery
/// task; the stream itself is released once the last handle is dropped,
/// which the registry does right after closing.
pub struct Connection {
    session: Arc<ZmtpSession>,
    delivery: parking_lot::Mutex<Option<AbortHandle>>,
    closed: AtomicBool,
}

impl Connection {
    pub fn new(session: ZmtpSession) -> Self {
        Self {
            session: Arc::new(session),
            delivery: parking_lot::Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<ZmtpSession> {
        &self.session
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session.local_addr().ok()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.session.peer_addr().ok()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Start pushing this peer's messages onto `tx`.
    ///
    /// Replaces (and cancels) any earlier delivery task.
    pub fn attach(&self, tx: flume::Sender<Message>, mode: DeliveryMode, prefix: Option<Bytes>) {
        if self.is_closed() {
            return;
        }
        let (handle, registration) = AbortHandle::new_pair();
        let delivery = Arc::clone(&self.session).deliver(tx, mode, prefix);
        compio::runtime::spawn(Abortable::new(delivery, registration)).detach();

        if let Some(previous) = self.delivery.lock().replace(handle) {
            previous.abort();
        }
    }

    pub async fn send_frame(&self, payload: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(self.session.send_frame(payload).await?)
    }

    pub async fn send_multipart(&self, frames: &[Bytes]) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(self.session.send_multipart(frames).await?)
    }
}

impl Closeable for Connection {
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::ConnectionClosed);
        }
        if let Some(handle) = self.delivery.lock().take() {
            handle.abort();
        }
        trace!("[SOCKET] Connection {:?} closed", self.peer_addr());
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.delivery.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
