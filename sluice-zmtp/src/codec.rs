use bytes::{Buf, BufMut, Bytes, BytesMut};
use sluice_core::socket_type::SocketType;
use thiserror::Error;

/// ZMTP frame flags
pub const FLAG_MORE: u8 = 0x01;
pub const FLAG_LONG: u8 = 0x02;
pub const FLAG_COMMAND: u8 = 0x04;

/// Bits 3-7 of the flags byte must be zero.
const RESERVED_BITS: u8 = 0xF8;

/// Largest body that fits the one-byte size field.
const SHORT_MAX: usize = u8::MAX as usize;

/// ZMTP protocol errors
#[derive(Debug, Error)]
pub enum ZmtpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol violation: reserved bits set")]
    ReservedBits,

    #[error("Protocol violation: frame size too large")]
    SizeTooLarge,

    #[error("Invalid greeting: {0}")]
    InvalidGreeting(&'static str),

    #[error("Malformed command: {0}")]
    MalformedCommand(&'static str),

    #[error("Unexpected {0} frame during handshake")]
    UnexpectedFrame(&'static str),

    #[error("Security mechanism mismatch: local {local}, peer {peer}")]
    MechanismMismatch { local: String, peer: String },

    #[error("Peer did not declare a Socket-Type")]
    MissingSocketType,

    #[error("Incompatible peer: {local} cannot talk to {peer}")]
    IncompatiblePeer { local: SocketType, peer: String },

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Peer sent ERROR: {0}")]
    PeerError(String),

    #[error("Message exceeds maximum size of {limit} bytes")]
    MessageTooLarge { limit: usize },

    #[error("Peer disconnected")]
    PeerDisconnected,
}

/// Result type alias for ZMTP operations
pub type Result<T> = std::result::Result<T, ZmtpError>;

/// A decoded ZMTP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZmtpFrame {
    pub flags: u8,
    pub payload: Bytes,
}

impl ZmtpFrame {
    /// Create a data frame
    pub fn data(payload: Bytes, more: bool) -> Self {
        let flags = if more { FLAG_MORE } else { 0 };
        Self { flags, payload }
    }

    /// Create a command frame
    pub fn command(payload: Bytes) -> Self {
        Self {
            flags: FLAG_COMMAND,
            payload,
        }
    }

    #[inline]
    pub const fn more(&self) -> bool {
        (self.flags & FLAG_MORE) != 0
    }

    #[inline]
    pub const fn is_command(&self) -> bool {
        (self.flags & FLAG_COMMAND) != 0
    }

    /// Append the wire encoding of this frame to `dst`.
    ///
    /// The LONG flag is derived from the payload length; whatever the
    /// caller put in `flags` for it is ignored.
    pub fn encode_into(&self, dst: &mut Vec<u8>) {
        let len = self.payload.len();
        dst.reserve(len + 9);
        if len <= SHORT_MAX {
            dst.put_u8(self.flags & !FLAG_LONG);
            dst.put_u8(len as u8);
        } else {
            dst.put_u8(self.flags | FLAG_LONG);
            dst.put_u64(len as u64);
        }
        dst.extend_from_slice(&self.payload);
    }

    /// Encode this frame into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

/// Encode a multipart message: MORE on every frame but the last.
///
/// An empty slice encodes to an empty buffer.
pub fn encode_multipart(frames: &[Bytes]) -> Vec<u8> {
    let total: usize = frames.iter().map(|f| f.len() + 9).sum();
    let mut out = Vec::with_capacity(total);
    let last = frames.len().saturating_sub(1);
    for (i, payload) in frames.iter().enumerate() {
        ZmtpFrame::data(payload.clone(), i < last).encode_into(&mut out);
    }
    out
}

/// Incremental ZMTP decoder.
///
/// Bytes read from the transport are appended with [`extend`](Self::extend);
/// [`decode`](Self::decode) yields complete frames as zero-copy slices of the
/// accumulated buffer and leaves partial frames in place until more bytes
/// arrive.
///
/// With a frame limit set, a data frame whose announced size exceeds it is
/// rejected as soon as its header is decoded, before the body is buffered.
#[derive(Debug, Default)]
pub struct ZmtpDecoder {
    buf: BytesMut,
    max_frame_size: Option<usize>,
}

impl ZmtpDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the announced size of data frames.
    pub fn set_max_frame_size(&mut self, limit: Option<usize>) {
        self.max_frame_size = limit;
    }

    /// Append raw bytes from the transport.
    pub fn extend(&mut self, src: &[u8]) {
        self.buf.extend_from_slice(src);
    }

    /// Number of buffered bytes not yet consumed.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Take exactly `n` raw bytes (the greeting precedes framing).
    pub fn take_raw(&mut self, n: usize) -> Option<Bytes> {
        (self.buf.len() >= n).then(|| self.buf.split_to(n).freeze())
    }

    /// Decode a single frame.
    ///
    /// Returns:
    /// - Ok(Some(frame)) → frame decoded
    /// - Ok(None) → need more data
    /// - Err → protocol violation
    pub fn decode(&mut self) -> Result<Option<ZmtpFrame>> {
        if self.buf.len() < 2 {
            return Ok(None);
        }

        let flags = self.buf[0];
        if (flags & RESERVED_BITS) != 0 {
            return Err(ZmtpError::ReservedBits);
        }

        let is_long = (flags & FLAG_LONG) != 0;
        let header_len = if is_long { 9 } else { 2 };
        if self.buf.len() < header_len {
            return Ok(None);
        }

        let body_len = if is_long {
            let mut size = &self.buf[1..9];
            let size = size.get_u64();
            // MSB must be zero in ZMTP 3.x
            if size > i64::MAX as u64 {
                return Err(ZmtpError::SizeTooLarge);
            }
            usize::try_from(size).map_err(|_| ZmtpError::SizeTooLarge)?
        } else {
            self.buf[1] as usize
        };

        if let Some(limit) = self.max_frame_size {
            if (flags & FLAG_COMMAND) == 0 && body_len > limit {
                return Err(ZmtpError::MessageTooLarge { limit });
            }
        }

        if self.buf.len() - header_len < body_len {
            return Ok(None);
        }

        self.buf.advance(header_len);
        let payload = self.buf.split_to(body_len).freeze();
        Ok(Some(ZmtpFrame {
            flags: flags & !FLAG_LONG,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frame_encoding() {
        let frame = ZmtpFrame::data(Bytes::from_static(b"HELLO"), false);
        assert_eq!(frame.encode(), b"\x00\x05HELLO");

        let frame = ZmtpFrame::data(Bytes::from_static(b"A"), true);
        assert_eq!(frame.encode(), b"\x01\x01A");
    }

    #[test]
    fn test_long_frame_encoding() {
        let body = Bytes::from(vec![7u8; 300]);
        let encoded = ZmtpFrame::data(body, false).encode();

        assert_eq!(encoded[0], FLAG_LONG);
        assert_eq!(&encoded[1..9], &300u64.to_be_bytes());
        assert_eq!(encoded.len(), 9 + 300);
    }

    #[test]
    fn test_boundary_255_uses_short_form() {
        let encoded = ZmtpFrame::data(Bytes::from(vec![0u8; 255]), false).encode();
        assert_eq!(encoded[0], 0);
        assert_eq!(encoded[1], 255);
        assert_eq!(encoded.len(), 257);
    }

    #[test]
    fn test_multipart_sets_more_on_all_but_last() {
        let encoded = encode_multipart(&[
            Bytes::from_static(b"id"),
            Bytes::new(),
            Bytes::from_static(b"WORLD"),
        ]);
        assert_eq!(encoded, b"\x01\x02id\x01\x00\x00\x05WORLD");
        assert!(encode_multipart(&[]).is_empty());
    }

    #[test]
    fn test_decode_waits_for_complete_frame() {
        let mut decoder = ZmtpDecoder::new();
        decoder.extend(b"\x00\x05HEL");
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.extend(b"LO\x04\x04PING");
        let frame = decoder.decode().unwrap().unwrap();
        assert_eq!(frame.payload, Bytes::from_static(b"HELLO"));
        assert!(!frame.more());

        let frame = decoder.decode().unwrap().unwrap();
        assert!(frame.is_command());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_long_frame_split_in_header() {
        let encoded = ZmtpFrame::data(Bytes::from(vec![1u8; 1000]), true).encode();
        let mut decoder = ZmtpDecoder::new();

        decoder.extend(&encoded[..5]);
        assert_eq!(decoder.decode().unwrap(), None);
        decoder.extend(&encoded[5..]);

        let frame = decoder.decode().unwrap().unwrap();
        assert!(frame.more());
        assert_eq!(frame.payload.len(), 1000);
    }

    #[test]
    fn test_reserved_bits_rejected() {
        let mut decoder = ZmtpDecoder::new();
        decoder.extend(b"\x08\x00");
        assert!(matches!(decoder.decode(), Err(ZmtpError::ReservedBits)));
    }

    #[test]
    fn test_size_msb_rejected() {
        let mut decoder = ZmtpDecoder::new();
        decoder.extend(&[FLAG_LONG, 0x80, 0, 0, 0, 0, 0, 0, 1]);
        assert!(matches!(decoder.decode(), Err(ZmtpError::SizeTooLarge)));
    }

    #[test]
    fn test_oversized_frame_rejected_from_header() {
        let mut decoder = ZmtpDecoder::new();
        decoder.set_max_frame_size(Some(1024));

        let mut header = vec![FLAG_LONG];
        header.extend_from_slice(&(1u64 << 40).to_be_bytes());
        decoder.extend(&header);
        assert!(matches!(
            decoder.decode(),
            Err(ZmtpError::MessageTooLarge { limit: 1024 })
        ));
    }

    #[test]
    fn test_frame_limit_spares_commands() {
        let mut decoder = ZmtpDecoder::new();
        decoder.set_max_frame_size(Some(2));

        decoder.extend(b"\x04\x05\x04PING\x00\x02ok\x00\x03big");
        assert!(decoder.decode().unwrap().unwrap().is_command());
        assert_eq!(
            decoder.decode().unwrap().unwrap().payload,
            Bytes::from_static(b"ok")
        );
        assert!(matches!(
            decoder.decode(),
            Err(ZmtpError::MessageTooLarge { limit: 2 })
        ));
    }

    #[test]
    fn test_take_raw() {
        let mut decoder = ZmtpDecoder::new();
        decoder.extend(&[0xFF; 10]);
        assert!(decoder.take_raw(64).is_none());
        assert_eq!(decoder.take_raw(4).unwrap().len(), 4);
        assert_eq!(decoder.buffered(), 6);
    }
}
