//! ZMTP commands: READY, ERROR, PING and PONG.
//!
//! A command frame body is `[name_len: u8][name]` followed by
//! command-specific data. READY data is a list of properties:
//! `[name_len: u8][name][value_len: u32 BE][value]`.

use crate::codec::{Result, ZmtpError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use sluice_core::socket_type::SocketType;

pub const READY: &[u8] = b"READY";
pub const ERROR: &[u8] = b"ERROR";
pub const PING: &[u8] = b"PING";
pub const PONG: &[u8] = b"PONG";

pub const PROP_SOCKET_TYPE: &str = "Socket-Type";
pub const PROP_IDENTITY: &str = "Identity";

/// Parsed command: name plus the undecoded data that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZmtpCommand {
    pub name: Bytes,
    pub data: Bytes,
}

impl ZmtpCommand {
    #[inline]
    pub fn is(&self, name: &[u8]) -> bool {
        self.name.as_ref() == name
    }
}

/// Split a command frame body into name and data.
pub fn parse_command(payload: &Bytes) -> Result<ZmtpCommand> {
    let name_len = *payload
        .first()
        .ok_or(ZmtpError::MalformedCommand("empty command"))? as usize;
    if payload.len() < 1 + name_len {
        return Err(ZmtpError::MalformedCommand("truncated command name"));
    }
    Ok(ZmtpCommand {
        name: payload.slice(1..1 + name_len),
        data: payload.slice(1 + name_len..),
    })
}

fn command_header(name: &[u8], capacity: usize) -> BytesMut {
    let mut body = BytesMut::with_capacity(1 + name.len() + capacity);
    body.put_u8(name.len() as u8);
    body.extend_from_slice(name);
    body
}

/// Property map exchanged in READY.
///
/// Property names are case-insensitive on lookup; insertion order is kept
/// so the encoded READY is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMetadata {
    props: Vec<(String, Bytes)>,
}

impl PeerMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        let name = name.into();
        let value = value.into();
        match self
            .props
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.props.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.props
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Declared `Socket-Type`, if any.
    pub fn socket_type(&self) -> Option<&Bytes> {
        self.get(PROP_SOCKET_TYPE)
    }

    /// Declared `Identity`; absent and empty are both `None`.
    pub fn identity(&self) -> Option<&Bytes> {
        self.get(PROP_IDENTITY).filter(|id| !id.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.props.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Check the declared socket type against ours.
    pub fn check_compatible(&self, local: SocketType) -> Result<SocketType> {
        let raw = self.socket_type().ok_or(ZmtpError::MissingSocketType)?;
        let peer_name = String::from_utf8_lossy(raw).into_owned();
        match SocketType::from_wire(raw) {
            Some(peer) if local.is_compatible(peer) => Ok(peer),
            _ => Err(ZmtpError::IncompatiblePeer {
                local,
                peer: peer_name,
            }),
        }
    }
}

/// Build a READY command body from the given properties.
///
/// Empty `Identity` values are omitted.
pub fn build_ready(props: &PeerMetadata) -> Bytes {
    let mut body = command_header(READY, 64);
    for (name, value) in props.iter() {
        if name.eq_ignore_ascii_case(PROP_IDENTITY) && value.is_empty() {
            continue;
        }
        put_property(&mut body, name, value);
    }
    body.freeze()
}

#[inline]
fn put_property(dst: &mut BytesMut, name: &str, value: &[u8]) {
    let name_bytes = name.as_bytes();
    dst.put_u8(name_bytes.len() as u8);
    dst.extend_from_slice(name_bytes);
    dst.put_u32(value.len() as u32);
    dst.extend_from_slice(value);
}

/// Parse READY properties from the command data.
pub fn parse_ready(data: &Bytes) -> Result<PeerMetadata> {
    let mut buf = data.clone();
    let mut meta = PeerMetadata::new();

    while buf.has_remaining() {
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len {
            return Err(ZmtpError::MalformedCommand("truncated property name"));
        }
        let name = buf.copy_to_bytes(name_len);
        let name = std::str::from_utf8(&name)
            .map_err(|_| ZmtpError::MalformedCommand("property name is not ASCII"))?
            .to_string();

        if buf.remaining() < 4 {
            return Err(ZmtpError::MalformedCommand("truncated property length"));
        }
        let value_len = buf.get_u32() as usize;
        if buf.remaining() < value_len {
            return Err(ZmtpError::MalformedCommand("truncated property value"));
        }
        let value = buf.copy_to_bytes(value_len);
        meta.insert(name, value);
    }

    Ok(meta)
}

/// Build an ERROR command body. Reasons over 255 bytes are truncated.
pub fn build_error(reason: &str) -> Bytes {
    let reason = &reason.as_bytes()[..reason.len().min(u8::MAX as usize)];
    let mut body = command_header(ERROR, 1 + reason.len());
    body.put_u8(reason.len() as u8);
    body.extend_from_slice(reason);
    body.freeze()
}

/// Extract the reason from ERROR command data.
pub fn parse_error(data: &Bytes) -> String {
    let Some((&len, rest)) = data.split_first() else {
        return String::new();
    };
    let len = (len as usize).min(rest.len());
    String::from_utf8_lossy(&rest[..len]).into_owned()
}

/// Build a PING command body: `[ttl: u16 BE][context]`.
pub fn build_ping(ttl_deciseconds: u16, context: &[u8]) -> Bytes {
    let mut body = command_header(PING, 2 + context.len());
    body.put_u16(ttl_deciseconds);
    body.extend_from_slice(context);
    body.freeze()
}

/// Build the PONG answering a PING; the context is echoed back.
pub fn build_pong(ping_data: &Bytes) -> Bytes {
    let context = ping_data.get(2..).unwrap_or_default();
    let mut body = command_header(PONG, context.len());
    body.extend_from_slice(context);
    body.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_props() -> PeerMetadata {
        PeerMetadata::new()
            .with(PROP_SOCKET_TYPE, "DEALER")
            .with(PROP_IDENTITY, "test_dealer")
    }

    #[test]
    fn test_ready_wire_layout() {
        let body = build_ready(&PeerMetadata::new().with(PROP_SOCKET_TYPE, "PUSH"));
        assert_eq!(
            body.as_ref(),
            b"\x05READY\x0bSocket-Type\x00\x00\x00\x04PUSH"
        );
    }

    #[test]
    fn test_ready_parses_back() {
        let body = build_ready(&local_props());
        let cmd = parse_command(&body).unwrap();
        assert!(cmd.is(READY));

        let meta = parse_ready(&cmd.data).unwrap();
        assert_eq!(meta.socket_type().unwrap().as_ref(), b"DEALER");
        assert_eq!(meta.identity().unwrap().as_ref(), b"test_dealer");
    }

    #[test]
    fn test_empty_identity_is_omitted() {
        let props = PeerMetadata::new()
            .with(PROP_SOCKET_TYPE, "CLIENT")
            .with(PROP_IDENTITY, Bytes::new());
        let cmd = parse_command(&build_ready(&props)).unwrap();
        let meta = parse_ready(&cmd.data).unwrap();
        assert_eq!(meta.len(), 1);
        assert!(meta.identity().is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let meta = PeerMetadata::new().with("socket-type", "ROUTER");
        assert_eq!(meta.socket_type().unwrap().as_ref(), b"ROUTER");

        let mut meta = meta;
        meta.insert("SOCKET-TYPE", "DEALER");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("Socket-Type").unwrap().as_ref(), b"DEALER");
    }

    #[test]
    fn test_compatibility_check() {
        let meta = PeerMetadata::new().with(PROP_SOCKET_TYPE, "ROUTER");
        assert_eq!(
            meta.check_compatible(SocketType::Dealer).unwrap(),
            SocketType::Router
        );
        assert!(matches!(
            meta.check_compatible(SocketType::Push),
            Err(ZmtpError::IncompatiblePeer { .. })
        ));
        assert!(matches!(
            PeerMetadata::new().check_compatible(SocketType::Push),
            Err(ZmtpError::MissingSocketType)
        ));
    }

    #[test]
    fn test_truncated_property_rejected() {
        let body = build_ready(&local_props());
        let truncated = body.slice(..body.len() - 3);
        let cmd = parse_command(&truncated).unwrap();
        assert!(matches!(
            parse_ready(&cmd.data),
            Err(ZmtpError::MalformedCommand(_))
        ));
        assert!(parse_command(&Bytes::new()).is_err());
        assert!(parse_command(&Bytes::from_static(b"\x05RE")).is_err());
    }

    #[test]
    fn test_error_command() {
        let cmd = parse_command(&build_error("Invalid identity")).unwrap();
        assert!(cmd.is(ERROR));
        assert_eq!(parse_error(&cmd.data), "Invalid identity");
    }

    #[test]
    fn test_pong_echoes_context() {
        let ping = parse_command(&build_ping(100, b"ctx-1")).unwrap();
        assert!(ping.is(PING));

        let pong = parse_command(&build_pong(&ping.data)).unwrap();
        assert!(pong.is(PONG));
        assert_eq!(pong.data.as_ref(), b"ctx-1");
    }
}
