use crate::codec::{Result, ZmtpError, ZmtpFrame};
use crate::command::{self, parse_command, parse_error, parse_ready, PeerMetadata};
use crate::mechanism::{require_command, Mechanism, Role};
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullState {
    /// READY queued, waiting for the peer's READY.
    NeedRecvReady,
    Done,
}

/// NULL mechanism (ZMTP/NULL, RFC 37 section "The NULL Security Mechanism").
///
/// Both sides send READY immediately and accept exactly one READY from the
/// peer. A peer ERROR aborts the handshake.
pub struct NullMechanism {
    role: Role,
    state: NullState,
    pending_out: Option<Bytes>,
    peer: PeerMetadata,
}

impl NullMechanism {
    pub fn new(role: Role, local: PeerMetadata) -> Self {
        Self {
            role,
            state: NullState::NeedRecvReady,
            pending_out: Some(command::build_ready(&local)),
            peer: PeerMetadata::new(),
        }
    }

    pub const fn role(&self) -> Role {
        self.role
    }
}

impl Mechanism for NullMechanism {
    fn name(&self) -> &'static str {
        "NULL"
    }

    fn next_outbound(&mut self) -> Option<Bytes> {
        self.pending_out.take()
    }

    fn on_inbound(&mut self, frame: &ZmtpFrame) -> Result<()> {
        require_command(frame)?;

        if self.state != NullState::NeedRecvReady {
            return Err(ZmtpError::MalformedCommand("handshake frame after READY"));
        }

        let cmd = parse_command(&frame.payload)?;
        if cmd.is(command::ERROR) {
            return Err(ZmtpError::PeerError(parse_error(&cmd.data)));
        }
        if !cmd.is(command::READY) {
            return Err(ZmtpError::MalformedCommand("expected READY"));
        }

        self.peer = parse_ready(&cmd.data)?;
        self.state = NullState::Done;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.state == NullState::Done
    }

    fn take_peer_metadata(&mut self) -> PeerMetadata {
        std::mem::take(&mut self.peer)
    }
}
