use crate::codec::ZmtpError;
use bytes::Bytes;

/// What a delivered message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Data,
    Command,
}

/// Unit pushed from a session's delivery loop onto the socket's inbound
/// channel.
///
/// A data message without an error always has at least one frame. An
/// error message may carry whatever frames were assembled before the
/// failure.
#[derive(Debug)]
pub struct Message {
    pub body: Vec<Bytes>,
    pub kind: MessageKind,
    pub error: Option<ZmtpError>,
}

impl Message {
    pub fn data(body: Vec<Bytes>) -> Self {
        Self {
            body,
            kind: MessageKind::Data,
            error: None,
        }
    }

    /// A command the session did not handle itself (raw command body).
    pub fn command(payload: Bytes) -> Self {
        Self {
            body: vec![payload],
            kind: MessageKind::Command,
            error: None,
        }
    }

    pub fn error(partial: Vec<Bytes>, error: ZmtpError) -> Self {
        Self {
            body: partial,
            kind: MessageKind::Data,
            error: Some(error),
        }
    }

    #[inline]
    pub fn is_command(&self) -> bool {
        self.kind == MessageKind::Command
    }

    /// Split into body and error.
    pub fn into_parts(self) -> (Vec<Bytes>, Option<ZmtpError>) {
        (self.body, self.error)
    }
}
