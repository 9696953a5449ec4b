//! ZMTP session over a connected stream.
//!
//! A session runs the handshake once (`prepare`), then splits into a write
//! side shared by senders and a read side driven by a single delivery loop.
//! Frames are decoded incrementally from whatever the transport returns, so
//! bytes that arrive together with the peer's READY are kept for delivery.

use crate::codec::{encode_multipart, Result, ZmtpDecoder, ZmtpError, ZmtpFrame};
use crate::command::{self, parse_command, PeerMetadata, PROP_IDENTITY, PROP_SOCKET_TYPE};
use crate::greeting::{ZmtpGreeting, GREETING_SIZE};
use crate::mechanism::{Role, SecurityMechanism};
use crate::message::Message;
use crate::multipart::MultipartBuffer;
use bytes::Bytes;
use compio::buf::BufResult;
use compio::io::{AsyncRead, AsyncWriteExt};
use compio::net::TcpStream;
use sluice_core::socket_type::SocketType;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Bytes requested from the transport per read.
const READ_CHUNK: usize = 8 * 1024;

/// How the delivery loop turns frames into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every data frame is its own message.
    Single,
    /// Frames are assembled until MORE clears.
    Multipart,
}

impl DeliveryMode {
    pub const fn for_socket(socket_type: SocketType) -> Self {
        if socket_type.is_multipart() {
            Self::Multipart
        } else {
            Self::Single
        }
    }
}

/// Handle to one ZMTP peer.
pub struct ZmtpSession {
    stream: TcpStream,
    /// Serializes writers so multipart messages never interleave.
    write_lock: async_lock::Mutex<()>,
    /// Inbound bytes not yet decoded; handed from `prepare` to `deliver`.
    decoder: parking_lot::Mutex<ZmtpDecoder>,
    max_msg_size: Option<usize>,
}

impl ZmtpSession {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            write_lock: async_lock::Mutex::new(()),
            decoder: parking_lot::Mutex::new(ZmtpDecoder::new()),
            max_msg_size: None,
        }
    }

    /// Bound the size of inbound messages.
    ///
    /// Oversized frames are refused from their header, before the body is
    /// read; multipart totals are checked as frames complete.
    pub fn with_max_msg_size(mut self, limit: Option<usize>) -> Self {
        self.max_msg_size = limit;
        self.decoder.get_mut().set_max_frame_size(limit);
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Run the greeting exchange and the mechanism handshake.
    ///
    /// READY advertises `socket_type`, `identity` (omitted when empty) and
    /// every property in `extra`. Returns the metadata the peer declared
    /// after checking that its socket type is compatible with ours.
    pub async fn prepare(
        &self,
        mechanism: SecurityMechanism,
        socket_type: SocketType,
        identity: &[u8],
        as_server: bool,
        extra: &PeerMetadata,
    ) -> Result<PeerMetadata> {
        let mut decoder = std::mem::take(&mut *self.decoder.lock());

        let greeting = ZmtpGreeting::new(mechanism.name(), as_server);
        self.write_raw(greeting.encode().to_vec()).await?;

        let raw = loop {
            if let Some(raw) = decoder.take_raw(GREETING_SIZE) {
                break raw;
            }
            self.read_chunk(&mut decoder).await?;
        };
        let peer_greeting = ZmtpGreeting::parse(&raw)?;
        trace!(
            "[SESSION] Peer greeting: ZMTP {}.{} {}",
            peer_greeting.major,
            peer_greeting.minor,
            peer_greeting.mechanism
        );

        if peer_greeting.mechanism != mechanism.name() {
            self.reject("security mechanism mismatch").await;
            return Err(ZmtpError::MechanismMismatch {
                local: mechanism.name().to_string(),
                peer: peer_greeting.mechanism,
            });
        }

        let mut local = PeerMetadata::new().with(PROP_SOCKET_TYPE, socket_type.as_str());
        if !identity.is_empty() {
            local.insert(PROP_IDENTITY, Bytes::copy_from_slice(identity));
        }
        for (name, value) in extra.iter() {
            local.insert(name, value.clone());
        }

        let mut mech = mechanism.build(Role::from_as_server(as_server), local);
        loop {
            while let Some(body) = mech.next_outbound() {
                self.send_command(body).await?;
            }
            if mech.is_done() {
                break;
            }
            let frame = self.read_frame(&mut decoder).await?;
            mech.on_inbound(&frame)?;
        }

        let peer = mech.take_peer_metadata();
        if let Err(e) = peer.check_compatible(socket_type) {
            self.reject("incompatible socket type").await;
            return Err(e);
        }

        debug!(
            "[SESSION] Handshake complete: {} <-> {}",
            socket_type,
            String::from_utf8_lossy(peer.socket_type().map_or(&b""[..], |v| &v[..]))
        );

        *self.decoder.lock() = decoder;
        Ok(peer)
    }

    /// Send one data frame.
    pub async fn send_frame(&self, payload: Bytes) -> Result<()> {
        self.write_raw(ZmtpFrame::data(payload, false).encode()).await
    }

    /// Send a multipart message (MORE on all frames but the last).
    pub async fn send_multipart(&self, frames: &[Bytes]) -> Result<()> {
        if frames.is_empty() {
            return Ok(());
        }
        self.write_raw(encode_multipart(frames)).await
    }

    async fn send_command(&self, body: Bytes) -> Result<()> {
        self.write_raw(ZmtpFrame::command(body).encode()).await
    }

    /// Best-effort ERROR before dropping a peer during handshake.
    async fn reject(&self, reason: &str) {
        if let Err(e) = self.send_command(command::build_error(reason)).await {
            trace!("[SESSION] Failed to send ERROR: {}", e);
        }
    }

    async fn write_raw(&self, buf: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut writer = &self.stream;
        let BufResult(res, _) = writer.write_all(buf).await;
        res?;
        Ok(())
    }

    async fn read_chunk(&self, decoder: &mut ZmtpDecoder) -> Result<()> {
        let mut reader = &self.stream;
        let BufResult(res, buf) = reader.read(Vec::with_capacity(READ_CHUNK)).await;
        let n = res?;
        if n == 0 {
            return Err(ZmtpError::PeerDisconnected);
        }
        decoder.extend(&buf[..n]);
        Ok(())
    }

    async fn read_frame(&self, decoder: &mut ZmtpDecoder) -> Result<ZmtpFrame> {
        loop {
            if let Some(frame) = decoder.decode()? {
                return Ok(frame);
            }
            self.read_chunk(decoder).await?;
        }
    }

    /// Answer keepalives; surface everything else to the socket.
    async fn handle_command(&self, frame: ZmtpFrame) -> Result<Option<Message>> {
        let cmd = parse_command(&frame.payload)?;
        if cmd.is(command::PING) {
            trace!("[SESSION] PING -> PONG");
            self.send_command(command::build_pong(&cmd.data)).await?;
            return Ok(None);
        }
        if cmd.is(command::PONG) {
            return Ok(None);
        }
        if cmd.is(command::ERROR) {
            return Err(ZmtpError::PeerError(command::parse_error(&cmd.data)));
        }
        Ok(Some(Message::command(frame.payload)))
    }

    /// Read frames and push messages onto `tx` until the peer goes away.
    ///
    /// In multipart mode each message is prefixed with `prefix` when given
    /// (the routing identity for ROUTER). The first error (EOF included) is
    /// delivered once as an error message, then the loop ends. The loop
    /// also ends quietly when the receiving side is dropped.
    pub async fn deliver(
        self: Arc<Self>,
        tx: flume::Sender<Message>,
        mode: DeliveryMode,
        prefix: Option<Bytes>,
    ) {
        let mut decoder = std::mem::take(&mut *self.decoder.lock());
        let mut multipart = MultipartBuffer::new(self.max_msg_size);

        loop {
            let message = match self.next_message(&mut decoder, &mut multipart, mode).await {
                Ok(Some(body)) => match (&prefix, mode) {
                    (Some(id), DeliveryMode::Multipart) => {
                        let mut framed = Vec::with_capacity(body.len() + 1);
                        framed.push(id.clone());
                        framed.extend(body);
                        Message::data(framed)
                    }
                    _ => Message::data(body),
                },
                Ok(None) => continue,
                Err(Delivery::Command(message)) => message,
                Err(Delivery::Failed(e)) => {
                    debug!("[SESSION] Delivery ended: {}", e);
                    let _ = tx.send_async(Message::error(multipart.take_partial(), e)).await;
                    return;
                }
            };

            if tx.send_async(message).await.is_err() {
                trace!("[SESSION] Receiver dropped, stopping delivery");
                return;
            }
        }
    }

    /// Read until one data message is complete.
    ///
    /// `Ok(None)` means a frame was consumed without completing a message.
    async fn next_message(
        &self,
        decoder: &mut ZmtpDecoder,
        multipart: &mut MultipartBuffer,
        mode: DeliveryMode,
    ) -> std::result::Result<Option<Vec<Bytes>>, Delivery> {
        let frame = self.read_frame(decoder).await?;

        if frame.is_command() {
            return match self.handle_command(frame).await? {
                Some(message) => Err(Delivery::Command(message)),
                None => Ok(None),
            };
        }

        match mode {
            DeliveryMode::Single => Ok(Some(vec![frame.payload])),
            DeliveryMode::Multipart => Ok(multipart.push_frame(frame)?),
        }
    }
}

/// Non-data outcomes of one delivery step.
enum Delivery {
    Command(Message),
    Failed(ZmtpError),
}

impl From<ZmtpError> for Delivery {
    fn from(e: ZmtpError) -> Self {
        Self::Failed(e)
    }
}

impl std::fmt::Debug for ZmtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZmtpSession")
            .field("local_addr", &self.stream.local_addr().ok())
            .field("peer_addr", &self.stream.peer_addr().ok())
            .finish_non_exhaustive()
    }
}
