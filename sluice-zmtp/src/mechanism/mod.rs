pub mod null;

use bytes::Bytes;

use crate::codec::{Result, ZmtpError, ZmtpFrame};
use crate::command::PeerMetadata;

/// Role of this endpoint (client/server) for handshake behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub const fn from_as_server(as_server: bool) -> Self {
        if as_server {
            Self::Server
        } else {
            Self::Client
        }
    }

    pub const fn is_server(&self) -> bool {
        matches!(self, Self::Server)
    }
}

/// Trait implemented by each security mechanism.
///
/// Mechanisms are sans-IO: the session pulls outbound command bodies,
/// writes them, and feeds inbound command frames back until the mechanism
/// reports completion.
pub trait Mechanism: Send {
    /// Name advertised in the greeting.
    fn name(&self) -> &'static str;

    /// Next command body to send, if any.
    fn next_outbound(&mut self) -> Option<Bytes>;

    /// Feed an inbound frame (command frames only during handshake).
    fn on_inbound(&mut self, frame: &ZmtpFrame) -> Result<()>;

    /// Whether the handshake is finished.
    fn is_done(&self) -> bool;

    /// Metadata the peer declared, once the handshake is done.
    fn take_peer_metadata(&mut self) -> PeerMetadata;
}

/// Security mechanism selected by a socket.
///
/// Only NULL is implemented; new variants plug in through [`Mechanism`]
/// without touching session logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMechanism {
    #[default]
    Null,
}

impl SecurityMechanism {
    /// Name as it appears in the greeting.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
        }
    }

    /// Build the handshake state machine advertising `local` in READY.
    pub fn build(self, role: Role, local: PeerMetadata) -> Box<dyn Mechanism> {
        match self {
            Self::Null => Box::new(null::NullMechanism::new(role, local)),
        }
    }
}

impl std::fmt::Display for SecurityMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// In handshake, any non-command data frame is a violation.
#[inline]
pub fn require_command(frame: &ZmtpFrame) -> Result<()> {
    if frame.is_command() {
        Ok(())
    } else {
        Err(ZmtpError::UnexpectedFrame("data"))
    }
}
