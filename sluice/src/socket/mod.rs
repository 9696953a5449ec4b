//! Socket core shared by every pattern variant.
//!
//! A [`Socket`] owns the live connections of one logical socket, the single
//! inbound channel all of their delivery tasks feed, and the shutdown signal
//! that cancels in-flight connects, accepts and receives.

pub mod connection;
pub mod registry;

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::future::AbortHandle;
use futures::{select, FutureExt};
use parking_lot::{Mutex, RwLock};
use sluice_core::monitor::{create_monitor, SocketEvent, SocketEventSender, SocketMonitor};
use sluice_core::options::SocketOptions;
use sluice_core::socket_type::SocketType;
use sluice_zmtp::{Message, SecurityMechanism};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub use connection::Connection;
pub use registry::{generate_key, Closeable, ConnectionRegistry};

/// Per-socket state: type, identity, mechanism, options, connections.
pub struct Socket {
    socket_type: SocketType,
    identity: Bytes,
    mechanism: SecurityMechanism,
    options: RwLock<SocketOptions>,
    registry: ConnectionRegistry<Connection>,
    /// Rendezvous channel shared by every delivery task.
    inbound_tx: flume::Sender<Message>,
    inbound_rx: flume::Receiver<Message>,
    /// Dropping the sender wakes everything waiting on `shutdown_rx`.
    shutdown_tx: Mutex<Option<flume::Sender<()>>>,
    shutdown_rx: flume::Receiver<()>,
    listeners: Mutex<Vec<AbortHandle>>,
    monitor: Mutex<Option<SocketEventSender>>,
    closed: AtomicBool,
}

impl Socket {
    pub fn new(
        socket_type: SocketType,
        mechanism: SecurityMechanism,
        identity: impl Into<Bytes>,
        options: SocketOptions,
    ) -> Self {
        let (inbound_tx, inbound_rx) = flume::bounded(0);
        let (shutdown_tx, shutdown_rx) = flume::bounded(1);
        Self {
            socket_type,
            identity: identity.into(),
            mechanism,
            options: RwLock::new(options),
            registry: ConnectionRegistry::new(),
            inbound_tx,
            inbound_rx,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            listeners: Mutex::new(Vec::new()),
            monitor: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    // --- registry ---

    /// Register a connection under a fresh generated key.
    ///
    /// Fails with [`Error::Closed`] once the socket is closed.
    pub fn add_connection(&self, conn: Arc<Connection>) -> Result<Bytes> {
        let key = self.registry.insert(conn)?;
        debug!("[SOCKET] {} added connection {:?}", self.socket_type, key);
        Ok(key)
    }

    /// Register a connection under `key` (generated when empty).
    pub fn add_connection_with_key(&self, conn: Arc<Connection>, key: Bytes) -> Result<Bytes> {
        let key = self.registry.insert_with_key(conn, key)?;
        debug!("[SOCKET] {} added connection {:?}", self.socket_type, key);
        Ok(key)
    }

    /// Close and forget the connection registered under `key`, if any.
    pub fn remove_connection(&self, key: &[u8]) {
        if self.registry.remove(key).is_some() {
            let key = Bytes::copy_from_slice(key);
            debug!("[SOCKET] {} removed connection {:?}", self.socket_type, key);
            self.emit(SocketEvent::Disconnected(key));
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Connection keys in registration order.
    pub fn connection_keys(&self) -> Vec<Bytes> {
        self.registry.keys()
    }

    // --- accessors ---

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn identity(&self) -> &Bytes {
        &self.identity
    }

    pub fn security_mechanism(&self) -> SecurityMechanism {
        self.mechanism
    }

    pub fn retry_interval(&self) -> Duration {
        self.options.read().retry_interval
    }

    pub fn set_retry_interval(&self, interval: Duration) {
        self.options.write().retry_interval = interval;
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> SocketOptions {
        self.options.read().clone()
    }

    /// Sender half of the inbound channel, for delivery tasks.
    pub fn recv_channel(&self) -> flume::Sender<Message> {
        self.inbound_tx.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // --- monitoring ---

    /// Start streaming lifecycle events. Replaces any earlier monitor.
    pub fn monitor(&self) -> SocketMonitor {
        let (tx, rx) = create_monitor();
        *self.monitor.lock() = Some(tx);
        rx
    }

    pub(crate) fn emit(&self, event: SocketEvent) {
        if let Some(tx) = self.monitor.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    // --- lifecycle ---

    /// Close every connection, stop listeners and wake pending operations.
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            trace!("[SOCKET] {} already closed", self.socket_type);
            return;
        }

        let released = self.registry.close_all();
        self.shutdown_tx.lock().take();
        for handle in self.listeners.lock().drain(..) {
            handle.abort();
        }

        debug!(
            "[SOCKET] {} closed ({} connections released)",
            self.socket_type, released
        );
        self.emit(SocketEvent::Closed);
    }

    /// Keep a listener task alive until the socket closes.
    pub(crate) fn track_listener(&self, handle: AbortHandle) {
        if self.is_closed() {
            handle.abort();
            return;
        }
        self.listeners.lock().push(handle);
    }

    /// Run `fut`, giving up with [`Error::Closed`] when the socket closes.
    pub(crate) async fn until_closed<F: Future>(&self, fut: F) -> Result<F::Output> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        select! {
            out = fut.fuse() => Ok(out),
            _ = self.shutdown_rx.recv_async().fuse() => Err(Error::Closed),
        }
    }

    // --- receive ---

    async fn next_message(&self) -> Result<Message> {
        let limit = self.options.read().recv_timeout;
        let recv = self.until_closed(self.inbound_rx.recv_async());
        let msg = match limit {
            Some(limit) => compio::time::timeout(limit, recv)
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => recv.await?,
        };
        msg.map_err(|_| Error::Closed)
    }

    /// Receive the next data message as its full frame sequence.
    ///
    /// Command messages are skipped. A message carrying a session error is
    /// returned as [`Error::Recv`] with whatever frames came with it.
    pub async fn recv_multipart(&self) -> Result<Vec<Bytes>> {
        loop {
            let msg = self.next_message().await?;
            if msg.is_command() {
                trace!("[SOCKET] {} skipping command message", self.socket_type);
                continue;
            }
            let (body, error) = msg.into_parts();
            if let Some(source) = error {
                return Err(Error::Recv {
                    partial: body,
                    source,
                });
            }
            return Ok(body);
        }
    }

    /// Receive the next data message and return its first frame.
    ///
    /// An empty body yields empty bytes.
    pub async fn recv(&self) -> Result<Bytes> {
        let body = self.recv_multipart().await?;
        Ok(body.into_iter().next().unwrap_or_default())
    }

    // --- send ---

    fn first_connection(&self) -> Result<Arc<Connection>> {
        self.registry.first().ok_or(Error::NoConnection)
    }

    async fn with_send_timeout<F>(&self, send: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let limit = self.options.read().send_timeout;
        match limit {
            Some(limit) => compio::time::timeout(limit, send)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => send.await,
        }
    }

    /// Send one frame on the earliest-registered connection.
    pub async fn send(&self, payload: Bytes) -> Result<()> {
        let conn = self.first_connection()?;
        self.with_send_timeout(conn.send_frame(payload)).await
    }

    /// Send a multipart message.
    ///
    /// ROUTER treats the first frame as the destination key and sends the
    /// remaining frames to that peer only. Every other type sends the whole
    /// sequence on the earliest-registered connection.
    pub async fn send_multipart(&self, frames: Vec<Bytes>) -> Result<()> {
        if self.socket_type == SocketType::Router {
            let (destination, payload) = frames
                .split_first()
                .ok_or(Error::InvalidRouterMultipart)?;
            if payload.is_empty() {
                return Err(Error::InvalidRouterMultipart);
            }
            let conn = self
                .registry
                .get(destination)
                .ok_or_else(|| Error::RouterDestinationNotFound(destination.clone()))?;
            trace!("[SOCKET] ROUTER -> {:?} ({} frames)", destination, payload.len());
            return self.with_send_timeout(conn.send_multipart(payload)).await;
        }

        let conn = self.first_connection()?;
        self.with_send_timeout(conn.send_multipart(&frames)).await
    }

    /// Convenience: send strings as frames.
    pub async fn send_multipart_str<S: AsRef<str>>(&self, parts: &[S]) -> Result<()> {
        let frames = parts
            .iter()
            .map(|part| Bytes::copy_from_slice(part.as_ref().as_bytes()))
            .collect();
        self.send_multipart(frames).await
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("socket_type", &self.socket_type)
            .field("identity", &self.identity)
            .field("mechanism", &self.mechanism)
            .field("connections", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
